use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use droidscope_adb::{AdbError, ToolFinder, spawn_logcat};

/// The command name handed to the discovery service.
const TOOL_NAME: &str = "adb";

/// Byte size of each read off the child's pipes.
const READ_CHUNK_SIZE: usize = 4096;

/// One unit of subprocess output delivered to the ingestion task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamItem {
    /// A decoded chunk of merged stdout/stderr text.
    Chunk(String),
    /// The subprocess exited or closed its pipe. Not an error.
    Ended,
}

/// Owns the logcat subprocess and its reader tasks.
///
/// At most one live handle at a time. A restart replaces the handle and the
/// cancellation token wholesale, so a stray read from an old session can
/// never deliver into a new one.
pub struct StreamSupervisor {
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    child: Option<Child>,
}

impl StreamSupervisor {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            child: None,
        }
    }

    /// Locate adb, spawn `adb logcat` and begin delivering chunks on `tx`.
    ///
    /// Any previous handle is stopped first. Discovery and spawn failures
    /// surface to the caller; nothing is retried here.
    pub fn start(
        &mut self,
        finder: &dyn ToolFinder,
        tx: mpsc::UnboundedSender<StreamItem>,
    ) -> Result<(), AdbError> {
        self.stop();

        let discovery = finder.find(TOOL_NAME)?;
        let mut child = spawn_logcat(&discovery)?;
        tracing::debug!(path = %discovery.path.display(), "logcat spawned");

        // stdout and stderr feed the same channel: one merged text stream.
        if let Some(stdout) = child.stdout.take() {
            let task = self.spawn_reader(stdout, tx.clone(), true);
            self.tasks.push(task);
        }
        if let Some(stderr) = child.stderr.take() {
            let task = self.spawn_reader(stderr, tx, false);
            self.tasks.push(task);
        }

        self.child = Some(child);
        Ok(())
    }

    fn spawn_reader<R>(
        &self,
        mut reader: R,
        tx: mpsc::UnboundedSender<StreamItem>,
        signal_end: bool,
    ) -> tokio::task::JoinHandle<()>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    result = reader.read(&mut buf) => {
                        match result {
                            Ok(0) => {
                                if signal_end {
                                    let _ = tx.send(StreamItem::Ended);
                                }
                                break;
                            }
                            Ok(n) => {
                                match std::str::from_utf8(&buf[..n]) {
                                    Ok(text) => {
                                        if tx.send(StreamItem::Chunk(text.to_string())).is_err() {
                                            // Receiver gone, stop reading
                                            break;
                                        }
                                    }
                                    Err(err) => {
                                        // A live tail skips fragments it
                                        // cannot decode.
                                        tracing::debug!(%err, "skipping undecodable chunk");
                                    }
                                }
                            }
                            Err(err) => {
                                tracing::warn!(%err, "pipe read failed");
                                if signal_end {
                                    let _ = tx.send(StreamItem::Ended);
                                }
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    /// Detach the readers first, then terminate the child, then release the
    /// handle. Calling with nothing live is a no-op.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.start_kill() {
                tracing::debug!(%err, "logcat already exited");
            }
        }
        // Fresh token for the next session
        self.cancel = CancellationToken::new();
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some() && self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Default for StreamSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidscope_adb::Discovery;
    use std::path::PathBuf;

    struct MissingFinder;

    impl ToolFinder for MissingFinder {
        fn find(&self, name: &str) -> Result<Discovery, AdbError> {
            Err(AdbError::ToolNotFound {
                name: name.to_string(),
            })
        }
    }

    struct BrokenFinder;

    impl ToolFinder for BrokenFinder {
        fn find(&self, _name: &str) -> Result<Discovery, AdbError> {
            Ok(Discovery {
                path: PathBuf::from("/droidscope/no/such/binary"),
                env: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn discovery_failure_surfaces_and_leaves_nothing_running() {
        let mut supervisor = StreamSupervisor::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = supervisor.start(&MissingFinder, tx).unwrap_err();
        assert!(matches!(err, AdbError::ToolNotFound { .. }));
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn spawn_failure_surfaces_and_leaves_nothing_running() {
        let mut supervisor = StreamSupervisor::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = supervisor.start(&BrokenFinder, tx).unwrap_err();
        assert!(matches!(err, AdbError::Spawn { .. }));
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn stop_with_no_live_handle_is_a_no_op() {
        let mut supervisor = StreamSupervisor::new();
        supervisor.stop();
        supervisor.stop();
        assert!(!supervisor.is_running());
    }
}
