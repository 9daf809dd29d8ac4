use keg_errors::{Error, FetchError};
use keg_events::EventEmitter;
use std::path::Path;
use tokio::process::Command;

/// Shallow checkout of `url` at `revision` (HEAD when `None`) into `dest`
///
/// Returns the commit id the checkout landed on, when git reports one.
pub(crate) async fn checkout<E>(
    url: &str,
    revision: Option<&str>,
    dest: &Path,
    events: &E,
) -> Result<Option<String>, Error>
where
    E: EventEmitter + ?Sized,
{
    which::which("git").map_err(|_| FetchError::GitFailed {
        url: url.to_string(),
        message: "git executable not found on PATH".to_string(),
    })?;

    let dest_str = dest.display().to_string();
    match revision {
        None => {
            events.emit_debug(format!("git clone --depth 1 {url}"));
            run_git(url, None, &["clone", "--depth", "1", "--", url, &dest_str]).await?;
        }
        Some(rev) => {
            events.emit_debug(format!("git fetch {url} {rev}"));
            tokio::fs::create_dir_all(dest)
                .await
                .map_err(|e| git_failed(url, &e.to_string()))?;
            run_git(url, Some(dest), &["init", "--quiet"]).await?;
            run_git(url, Some(dest), &["remote", "add", "origin", url]).await?;

            // Servers may refuse shallow fetches of arbitrary commits
            let shallow = run_git(url, Some(dest), &["fetch", "--depth", "1", "origin", rev]).await;
            if shallow.is_ok() {
                run_git(url, Some(dest), &["checkout", "--quiet", "FETCH_HEAD"]).await?;
            } else {
                tracing::debug!(url, rev, "shallow fetch refused, fetching all branches and tags");
                run_git(
                    url,
                    Some(dest),
                    &[
                        "fetch",
                        "--tags",
                        "origin",
                        "+refs/heads/*:refs/remotes/origin/*",
                    ],
                )
                .await?;
                run_git(url, Some(dest), &["checkout", "--quiet", rev]).await?;
            }
        }
    }

    let commit = run_git(url, Some(dest), &["rev-parse", "HEAD"])
        .await
        .ok()
        .map(|out| out.trim().to_string())
        .filter(|c| !c.is_empty());
    tracing::debug!(url, ?commit, "checkout complete");
    Ok(commit)
}

async fn run_git(url: &str, cwd: Option<&Path>, args: &[&str]) -> Result<String, Error> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| git_failed(url, &e.to_string()))?;

    if !output.status.success() {
        return Err(git_failed(
            url,
            &format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_failed(url: &str, message: &str) -> Error {
    FetchError::GitFailed {
        url: url.to_string(),
        message: message.to_string(),
    }
    .into()
}
