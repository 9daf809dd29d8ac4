//! Timeout utilities for build operations

use keg_errors::{BuildError, Error};
use std::future::Future;
use std::time::Duration;

/// Execute a future with a timeout
///
/// Dropping the future on expiry drops whatever it owns, so a child
/// process spawned with `kill_on_drop` is killed.
async fn with_timeout<T, F>(future: F, timeout: Duration, package_name: &str) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| -> Error {
            BuildError::Timeout {
                package: package_name.to_string(),
                seconds: timeout.as_secs(),
            }
            .into()
        })?
}

/// Execute a future with an optional timeout
pub(crate) async fn with_optional_timeout<T, F>(
    future: F,
    timeout: Option<Duration>,
    package_name: &str,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    if let Some(timeout) = timeout {
        with_timeout(future, timeout, package_name).await
    } else {
        future.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_future_is_build_timeout() {
        let result: Result<(), Error> = with_optional_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Some(Duration::from_millis(10)),
            "blisp",
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Build(BuildError::Timeout { ref package, .. })) if package == "blisp"
        ));
    }

    #[tokio::test]
    async fn no_timeout_runs_to_completion() {
        let value = with_optional_timeout(async { Ok::<_, Error>(7) }, None, "blisp")
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
