//! Toolchain invocation producing the package executable

use crate::extract::SourceTree;
use crate::utils::timeout::with_optional_timeout;
use keg_errors::{BuildError, Error};
use keg_events::{AppEvent, BuildEvent, EventEmitter};
use keg_types::PackageSpec;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Subdirectory of the stage dir the toolchain writes into
const STAGE_BIN: &str = "bin";

/// Executable produced by a successful build, still in the scratch stage dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Build settings that come from configuration rather than the formula
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub timeout: Option<Duration>,
}

/// Resolve every build dependency and the toolchain program on `PATH`
///
/// # Errors
///
/// Returns `BuildError::MissingToolchain` naming the first one not found.
pub fn check_toolchain(spec: &PackageSpec) -> Result<PathBuf, Error> {
    for dep in &spec.build_dependencies {
        which::which(dep).map_err(|_| BuildError::MissingToolchain { name: dep.clone() })?;
    }

    let program = &spec.build_command.program;
    if Path::new(program).components().count() > 1 {
        let path = PathBuf::from(program);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(BuildError::MissingToolchain {
                name: program.clone(),
            }
            .into())
        };
    }

    which::which(program).map_err(|_| {
        BuildError::MissingToolchain {
            name: program.clone(),
        }
        .into()
    })
}

/// Run the package's build command in `tree`, writing to `stage_dir/bin/<name>`
///
/// The child is killed if `options.timeout` elapses.
///
/// # Errors
///
/// Returns `BuildError::MissingToolchain` before anything runs,
/// `BuildError::Failed` on a non-zero exit, `BuildError::Timeout` on expiry,
/// and `BuildError::MissingArtifact` when the command succeeds without
/// producing a file.
pub async fn build<E>(
    spec: &PackageSpec,
    tree: &SourceTree,
    stage_dir: &Path,
    options: &BuildOptions,
    events: &E,
) -> Result<Artifact, Error>
where
    E: EventEmitter + ?Sized,
{
    let program = check_toolchain(spec)?;

    let output = stage_dir.join(STAGE_BIN).join(&spec.name);
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BuildError::StagingFailed {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
    }

    let args = spec
        .build_command
        .render_args(&output, &spec.name, &spec.version);
    let command_line = spec.build_command.display_with(&args);

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .envs(&spec.build_command.env)
        .current_dir(tree.root())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    events.emit(AppEvent::Build(BuildEvent::CommandStarted {
        command: command_line.clone(),
        working_dir: tree.root().to_path_buf(),
    }));
    tracing::debug!(command = %command_line, cwd = %tree.root().display(), "running toolchain");

    let started = Instant::now();
    let child = cmd.spawn().map_err(|e| BuildError::SpawnFailed {
        command: command_line.clone(),
        message: e.to_string(),
    })?;

    let run = async {
        child.wait_with_output().await.map_err(|e| -> Error {
            BuildError::SpawnFailed {
                command: command_line.clone(),
                message: e.to_string(),
            }
            .into()
        })
    };
    let result = with_optional_timeout(run, options.timeout, &spec.name).await?;

    events.emit(AppEvent::Build(BuildEvent::CommandFinished {
        command: command_line.clone(),
        exit_code: result.status.code(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }));

    if !result.status.success() {
        return Err(BuildError::Failed {
            command: command_line,
            exit_code: result.status.code(),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        }
        .into());
    }

    match tokio::fs::metadata(&output).await {
        Ok(meta) if meta.is_file() => Ok(Artifact {
            path: output,
            size: meta.len(),
        }),
        _ => Err(BuildError::MissingArtifact {
            path: output.display().to_string(),
        }
        .into()),
    }
}
