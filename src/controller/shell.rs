//! Run healthcheck commands the way the healthcheck helper does: through
//! `/bin/sh -c`, bounded by the process timeout.

use std::process::Stdio;
use std::time::Duration;

use log::{debug, warn};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Outcome of a shell command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// None when killed by a signal or the timeout
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Execute `cmd`, killing it once `limit` expires.
/// Only a failure to spawn the shell is an error.
pub async fn exec(cmd: &str, limit: Duration) -> Result<ExecResult> {
    debug!("Executing '{}' (timeout {:?})", cmd, limit);
    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| Error::io(format!("Spawning '{}'", cmd), err))?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(output) => output.map_err(|err| Error::io(format!("Waiting for '{}'", cmd), err))?,
        Err(_) => {
            warn!("'{}' timed out after {:?}", cmd, limit);
            return Ok(ExecResult {
                timed_out: true,
                ..Default::default()
            });
        }
    };

    let result = ExecResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        timed_out: false,
    };
    if !result.success() {
        debug!(
            "'{}' exited with {:?}: {}",
            cmd, result.exit_code, result.stderr
        );
    }
    Ok(result)
}

/// Whether `cmd` exits 0 within `limit`
pub async fn check(cmd: &str, limit: Duration) -> bool {
    match exec(cmd, limit).await {
        Ok(result) => result.success(),
        Err(err) => {
            warn!("{}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exec() {
        let result = exec("echo up; echo down >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout, "up");
        assert_eq!(result.stderr, "down");
        assert!(!result.success());
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_check() {
        assert!(check("true", Duration::from_secs(5)).await);
        assert!(!check("false", Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_timeout() {
        let result = exec("sleep 5", Duration::from_millis(100)).await.unwrap();
        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(!check("sleep 5", Duration::from_millis(100)).await);
    }
}
