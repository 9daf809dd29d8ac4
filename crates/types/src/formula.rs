//! Formula files: the declarative recipe a [`PackageSpec`] is built from
//!
//! A formula carries the fields a Homebrew formula declares (`desc`,
//! `homepage`, `url`, `sha256`, `version`, `depends_on`, `install`) in TOML:
//!
//! ```toml
//! desc = "Blisp interpreter"
//! homepage = "https://github.com/JacksonO123/blisp"
//! url = "https://github.com/JacksonO123/blisp/archive/refs/tags/prod.tar.gz"
//! sha256 = "b4859e6a24847c4ae943331ec3e190ddc881ecd6d651a2eb25a3184f66e56f39"
//! version = "0.1.1"
//! depends_on = [{ name = "go", kind = "build" }]
//! ```

use crate::package::{BuildCommand, PackageSpec, DEFAULT_MODE};
use crate::{DigestAlgorithm, ExpectedDigest, SourceLocation, Version};
use keg_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Toolchain used when a formula declares neither a build dependency nor a
/// command
const FALLBACK_TOOLCHAIN: &str = "go";

/// Parsed formula file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Formula {
    /// Defaults to the formula file stem
    pub name: Option<String>,
    pub desc: Option<String>,
    pub homepage: Option<String>,
    pub url: String,
    pub sha256: Option<String>,
    pub blake3: Option<String>,
    pub version: String,
    /// Pins a repository source; ignored for archives
    pub revision: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<Dependency>,
    #[serde(default)]
    pub install: InstallSection,
}

/// A `depends_on` entry, written either as `"go"` or `{ name = "go", kind = "build" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DependencyDecl")]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Build,
    #[default]
    Runtime,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyDecl {
    Name(String),
    Table {
        name: String,
        #[serde(default)]
        kind: DependencyKind,
    },
}

impl From<DependencyDecl> for Dependency {
    fn from(decl: DependencyDecl) -> Self {
        match decl {
            DependencyDecl::Name(name) => Self {
                name,
                kind: DependencyKind::default(),
            },
            DependencyDecl::Table { name, kind } => Self { name, kind },
        }
    }
}

/// The `[install]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    /// Full argv; must contain `{output}`
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Octal permission string such as `"0755"`
    pub mode: Option<String>,
}

impl Formula {
    /// Parse formula TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` naming `origin` when the TOML is
    /// invalid or has unknown fields.
    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Names of toolchains declared with `kind = "build"`
    #[must_use]
    pub fn build_dependencies(&self) -> Vec<String> {
        self.depends_on
            .iter()
            .filter(|d| d.kind == DependencyKind::Build)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Resolve into an immutable spec installing into `install_path`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing/invalid name, version, digest
    /// selection or mode, `IntegrityError::MalformedDigest` for a digest that
    /// is not 64 hex characters, `FetchError` for an unusable `url`, and
    /// `BuildError::InvalidCommand` for a bad `install.command`.
    pub fn into_spec(
        self,
        fallback_name: Option<&str>,
        install_path: PathBuf,
    ) -> Result<PackageSpec, Error> {
        let name = self
            .name
            .as_deref()
            .or(fallback_name)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "name".to_string(),
            })?
            .to_string();
        validate_name(&name)?;

        let version =
            Version::parse(self.version.trim()).map_err(|e| ConfigError::InvalidValue {
                field: "version".to_string(),
                value: format!("{} ({e})", self.version),
            })?;

        let expected_digest = match (&self.sha256, &self.blake3) {
            (Some(hex), None) => ExpectedDigest::parse(DigestAlgorithm::Sha256, hex)?,
            (None, Some(hex)) => ExpectedDigest::parse(DigestAlgorithm::Blake3, hex)?,
            (None, None) => {
                return Err(ConfigError::MissingField {
                    field: "digest".to_string(),
                }
                .into())
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    message: "declare either sha256 or blake3, not both".to_string(),
                }
                .into())
            }
        };

        let source = SourceLocation::parse(&self.url, self.revision.as_deref())?;
        let build_dependencies = self.build_dependencies();

        let build_command = match &self.install.command {
            Some(argv) => BuildCommand::from_argv(argv, self.install.env.clone())?,
            None => {
                let toolchain = build_dependencies
                    .first()
                    .map_or(FALLBACK_TOOLCHAIN, String::as_str);
                let mut command = BuildCommand::toolchain_default(toolchain);
                command.env.clone_from(&self.install.env);
                command
            }
        };

        let mode = match &self.install.mode {
            Some(raw) => parse_mode(raw)?,
            None => DEFAULT_MODE,
        };

        Ok(PackageSpec {
            name,
            version,
            description: self.desc,
            homepage: self.homepage,
            source,
            expected_digest,
            build_command,
            build_dependencies,
            install_path,
            mode,
        })
    }
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    let bad = name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(ConfigError::InvalidValue {
            field: "name".to_string(),
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Parse an octal mode and require the owner execute bit
fn parse_mode(raw: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: "install.mode".to_string(),
        value: raw.to_string(),
    };
    let digits = raw.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    let mode = u32::from_str_radix(digits, 8).map_err(|_| invalid())?;
    if mode > 0o7777 || mode & 0o100 == 0 {
        return Err(invalid());
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keg_errors::IntegrityError;

    const BLISP_0_1_1: &str = r#"
desc = "Blisp interpreter"
homepage = "https://github.com/JacksonO123/blisp"
url = "https://github.com/JacksonO123/blisp/archive/refs/tags/prod.tar.gz"
sha256 = "b4859e6a24847c4ae943331ec3e190ddc881ecd6d651a2eb25a3184f66e56f39"
version = "0.1.1"
depends_on = [{ name = "go", kind = "build" }]
"#;

    const BLISP_1_0_0: &str = r#"
desc = "Blisp interpreter"
homepage = "https://github.com/JacksonO123/blisp"
url = "https://github.com/JacksonO123/blisp"
sha256 = "fba6f9bef983449aa7e7cdece67644f9c265fdde8761191f28ced73bd2c4c225"
version = "1.0.0"
depends_on = [{ name = "go", kind = "build" }]
"#;

    #[test]
    fn tarball_formula_is_pinned() {
        let formula = Formula::from_toml_str(BLISP_0_1_1, "blisp.toml").unwrap();
        let spec = formula
            .into_spec(Some("blisp"), PathBuf::from("/usr/local/bin"))
            .unwrap();

        assert_eq!(spec.name, "blisp");
        assert_eq!(spec.version, Version::new(0, 1, 1));
        assert_eq!(spec.build_dependencies, vec!["go"]);
        assert_eq!(spec.build_command, BuildCommand::toolchain_default("go"));
        assert_eq!(spec.mode, 0o755);
        assert_eq!(spec.target_path(), PathBuf::from("/usr/local/bin/blisp"));
        assert!(spec.reproducibility().is_pinned());
    }

    #[test]
    fn head_formula_is_flagged_unpinned() {
        let formula = Formula::from_toml_str(BLISP_1_0_0, "blisp.toml").unwrap();
        let spec = formula
            .into_spec(Some("blisp"), PathBuf::from("/opt/keg/bin"))
            .unwrap();

        assert!(matches!(
            spec.source,
            SourceLocation::Repository { revision: None, .. }
        ));
        assert!(!spec.reproducibility().is_pinned());
    }

    #[test]
    fn revision_field_pins_repository() {
        let text = BLISP_1_0_0.replace("version = \"1.0.0\"", "version = \"1.0.0\"\nrevision = \"v1.0.0\"");
        let spec = Formula::from_toml_str(&text, "blisp.toml")
            .unwrap()
            .into_spec(Some("blisp"), PathBuf::from("/opt/keg/bin"))
            .unwrap();
        assert!(spec.reproducibility().is_pinned());
    }

    #[test]
    fn plain_string_dependency_is_runtime() {
        let text = BLISP_0_1_1.replace(
            r#"depends_on = [{ name = "go", kind = "build" }]"#,
            r#"depends_on = ["readline", { name = "go", kind = "build" }]"#,
        );
        let formula = Formula::from_toml_str(&text, "blisp.toml").unwrap();
        assert_eq!(formula.depends_on[0].kind, DependencyKind::Runtime);
        assert_eq!(formula.build_dependencies(), vec!["go"]);
    }

    #[test]
    fn overlong_digest_is_rejected() {
        let text = BLISP_0_1_1.replace("e56f39\"", "e56f39ff\"");
        let err = Formula::from_toml_str(&text, "blisp.toml")
            .unwrap()
            .into_spec(Some("blisp"), PathBuf::from("/bin"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::MalformedDigest { .. })
        ));
    }

    #[test]
    fn missing_digest_is_a_config_error() {
        let text = BLISP_0_1_1
            .lines()
            .filter(|l| !l.starts_with("sha256"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = Formula::from_toml_str(&text, "blisp.toml")
            .unwrap()
            .into_spec(Some("blisp"), PathBuf::from("/bin"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let text = format!("{BLISP_0_1_1}\nbottle = true\n");
        assert!(matches!(
            Formula::from_toml_str(&text, "blisp.toml"),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn name_is_required_and_sane() {
        let formula = Formula::from_toml_str(BLISP_0_1_1, "blisp.toml").unwrap();
        assert!(formula
            .clone()
            .into_spec(None, PathBuf::from("/bin"))
            .is_err());
        assert!(formula
            .into_spec(Some("../evil"), PathBuf::from("/bin"))
            .is_err());
    }

    #[test]
    fn modes() {
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(parse_mode("0o750").unwrap(), 0o750);
        assert!(parse_mode("0644").is_err());
        assert!(parse_mode("rwx").is_err());
        assert!(parse_mode("17777").is_err());
    }
}
