//! Integration tests for the keg CLI

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const BLISP_FORMULA: &str = r#"
desc = "Blisp interpreter"
homepage = "https://github.com/JacksonO123/blisp"
url = "https://github.com/JacksonO123/blisp/archive/refs/tags/prod.tar.gz"
sha256 = "b4859e6a24847c4ae943331ec3e190ddc881ecd6d651a2eb25a3184f66e56f39"
version = "0.1.1"
depends_on = [{ name = "go", kind = "build" }]
"#;

fn keg(dir: &Path) -> Command {
    let config = dir.join("config.toml");
    if !config.exists() {
        std::fs::write(
            &config,
            format!(
                "[build]\nscratch_dir = {:?}\n",
                dir.join("scratch").display().to_string()
            ),
        )
        .unwrap();
        std::fs::create_dir_all(dir.join("scratch")).unwrap();
    }

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_keg"));
    cmd.arg("--config")
        .arg(&config)
        .arg("--color")
        .arg("never")
        .env_remove("RUST_LOG");
    for var in [
        "KEG_PREFIX",
        "KEG_COLOR",
        "KEG_BUILD_TIMEOUT",
        "KEG_RETRIES",
        "KEG_KEEP_SCRATCH",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("Failed to execute keg")
}

fn write_formula(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(format!("{name}.toml"));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_cli_version() {
    let output = run(Command::new(env!("CARGO_BIN_EXE_keg")).arg("--version"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("keg"));
}

#[test]
fn test_cli_help() {
    let output = run(Command::new(env!("CARGO_BIN_EXE_keg")).arg("--help"));

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("info"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run(Command::new(env!("CARGO_BIN_EXE_keg")).arg("invalid-command"));

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_info_does_not_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let formula = write_formula(dir.path(), "blisp", BLISP_FORMULA);

    let output = run(keg(dir.path())
        .arg("info")
        .arg(&formula)
        .arg("--prefix")
        .arg(dir.path().join("prefix")));

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("blisp 0.1.1"));
    assert!(stdout.contains("go build -o"));
    assert!(stdout.contains("reproducible: yes"));
    assert!(stdout.contains(&dir.path().join("prefix/bin/blisp").display().to_string()));
}

#[test]
fn test_info_json_flags_head_source() {
    let dir = tempfile::tempdir().unwrap();
    let head = BLISP_FORMULA
        .replace("/archive/refs/tags/prod.tar.gz", "")
        .replace("0.1.1", "1.0.0");
    let formula = write_formula(dir.path(), "blisp", &head);

    let output = run(keg(dir.path()).arg("--json").arg("info").arg(&formula));

    assert!(output.status.success(), "{output:?}");
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["name"], "blisp");
    assert_eq!(summary["reproducibility"]["status"], "unpinned");
}

#[test]
fn test_missing_formula_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(keg(dir.path())
        .arg("install")
        .arg(dir.path().join("nope.toml")));

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[config]"), "{stderr}");
}

#[cfg(unix)]
mod install {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use keg_hash::{DigestAlgorithm, Hash};
    use std::os::unix::fs::PermissionsExt;

    const FAKE_GO: &str = r#"#!/bin/sh
[ "$1" = "build" ] || exit 64
printf '#!/bin/sh\necho blisp\n' > "$3"
"#;

    fn release_archive() -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let data = b"package main\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "blisp-prod/main.go", data.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Formula pointing at a local archive, with a fake `go` first on PATH
    fn setup(dir: &Path, digest_of: &[u8], archive: &[u8]) -> (PathBuf, String) {
        let archive_path = dir.join("prod.tar.gz");
        std::fs::write(&archive_path, archive).unwrap();

        let tools = dir.join("tools");
        std::fs::create_dir_all(&tools).unwrap();
        let go = tools.join("go");
        std::fs::write(&go, FAKE_GO).unwrap();
        std::fs::set_permissions(&go, std::fs::Permissions::from_mode(0o755)).unwrap();

        let digest = Hash::from_data(DigestAlgorithm::Sha256, digest_of).to_hex();
        let formula = format!(
            "desc = \"Blisp interpreter\"\nurl = \"file://{}\"\nsha256 = \"{digest}\"\nversion = \"0.1.0\"\ndepends_on = [{{ name = \"go\", kind = \"build\" }}]\n",
            archive_path.display()
        );
        let formula = write_formula(dir, "blisp", &formula);

        let path = format!(
            "{}:{}",
            tools.display(),
            std::env::var("PATH").unwrap_or_default()
        );
        (formula, path)
    }

    #[test]
    fn test_install_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let archive = release_archive();
        let (formula, path) = setup(dir.path(), &archive, &archive);
        let bin_dir = dir.path().join("bin");

        let output = run(keg(dir.path())
            .env("PATH", &path)
            .arg("--json")
            .arg("install")
            .arg(&formula)
            .arg("--bin-dir")
            .arg(&bin_dir));

        assert!(output.status.success(), "{output:?}");
        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["mode"], 0o755);
        assert_eq!(report["reproducibility"]["status"], "pinned");

        let installed = bin_dir.join("blisp");
        let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
        assert!(mode & 0o100 != 0);
        let out = Command::new(&installed).output().unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "blisp");
    }

    #[test]
    fn test_flipped_byte_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let archive = release_archive();
        let mut tampered = archive.clone();
        tampered[20] ^= 0x01;
        let (formula, path) = setup(dir.path(), &archive, &tampered);
        let bin_dir = dir.path().join("bin");

        let output = run(keg(dir.path())
            .env("PATH", &path)
            .arg("install")
            .arg(&formula)
            .arg("--bin-dir")
            .arg(&bin_dir));

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(stderr.matches("[verify]").count(), 1, "{stderr}");
        assert_eq!(stderr.matches("integrity.mismatch").count(), 1, "{stderr}");
        assert!(stderr.contains("error: verify failed\n"), "{stderr}");
        // no tracing lines interleaved with the report
        assert!(!stderr.contains(" ERROR "), "{stderr}");
        assert!(!stderr.contains(" WARN "), "{stderr}");
        assert!(!bin_dir.join("blisp").exists());
    }
}
