//! Shell-command implementation of the pre-checkin hook.

use std::{io, path::Path, process::Command};

use {realay_common::PreCheckinHook, tracing::debug};

/// Runs a configured shell command before checkin, e.g. to make the host
/// application close the project so no file is half-written.
///
/// The command sees `REALAY_PROJECT` and `REALAY_LOCAL_PATH`. A non-zero
/// exit aborts the checkin.
pub struct ShellPreCheckin {
    command: String,
}

impl ShellPreCheckin {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PreCheckinHook for ShellPreCheckin {
    fn before_checkin(&self, project: &str, local_path: &Path) -> io::Result<()> {
        debug!(cmd = %self.command, project, "running pre-checkin command");
        let output = Command::new("sh")
            .args(["-c", &self.command])
            .env("REALAY_PROJECT", project)
            .env("REALAY_LOCAL_PATH", local_path.as_os_str())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(format!(
                "pre-checkin command `{}` failed ({}): {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn exposes_project_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("seen.txt");
        let hook = ShellPreCheckin::new(format!(
            "printf '%s %s' \"$REALAY_PROJECT\" \"$REALAY_LOCAL_PATH\" > '{}'",
            out.display()
        ));
        hook.before_checkin("song", Path::new("/work/song"))
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "song /work/song"
        );
    }

    #[test]
    fn failing_command_is_an_error() {
        let hook = ShellPreCheckin::new("echo busy >&2; exit 3");
        let err = hook
            .before_checkin("song", Path::new("/work/song"))
            .unwrap_err();
        assert!(err.to_string().contains("busy"));
    }
}
