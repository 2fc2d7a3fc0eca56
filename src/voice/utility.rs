//! Running the ALSA command-line utilities

use std::path::Path;

use tokio::process::Command;

use crate::{Error, Result};

/// Run `program` to completion, mapping launch and exit failures
///
/// Success is communicated only through the exit status.
pub async fn run_utility(program: &str, args: &[String]) -> Result<()> {
    tracing::debug!(program, args = ?args, "running utility");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::DeviceUnavailable(format!(
                    "{program} not found (is alsa-utils installed?)"
                ))
            } else {
                Error::DeviceFailure(format!("failed to run {program}: {e}"))
            }
        })?;

    if output.status.success() {
        return Ok(());
    }

    let code = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if stderr.to_lowercase().contains("busy") {
        return Err(Error::DeviceFailure(format!("{program}: device busy: {stderr}")));
    }

    Err(Error::DeviceFailure(format!(
        "{program} exited with code {code}: {stderr}"
    )))
}

/// Remove `path` if it exists
pub async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let err = run_utility("hearth-no-such-utility", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = run_utility("false", &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceFailure);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_busy_device_reported() {
        let args = vec!["-c".to_string(), "echo 'Device or resource busy' >&2; exit 1".to_string()];
        let err = run_utility("sh", &args).await.unwrap_err();
        assert!(err.to_string().contains("device busy"));
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_if_present(&dir.path().join("gone.wav")).await.is_ok());
    }
}
