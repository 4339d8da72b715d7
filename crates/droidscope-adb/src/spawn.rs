use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::{AdbError, Discovery};

/// Build the `logcat` command for a discovered adb binary.
///
/// Both output pipes are captured; the stream supervisor merges them into a
/// single chunk channel. `kill_on_drop` backstops the supervisor's explicit
/// termination so an orphaned child cannot outlive the session.
pub fn logcat_command(discovery: &Discovery) -> Command {
    let mut cmd = Command::new(&discovery.path);
    cmd.arg("logcat")
        .envs(discovery.env.iter().cloned())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

pub fn spawn_logcat(discovery: &Discovery) -> Result<Child, AdbError> {
    logcat_command(discovery)
        .spawn()
        .map_err(|source| AdbError::Spawn {
            binary: discovery.path.clone(),
            source,
        })
}
