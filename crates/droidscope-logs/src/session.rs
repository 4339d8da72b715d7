use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use droidscope_adb::{AdbError, ToolFinder};
use droidscope_types::{Entry, Level, StreamMode};

use crate::buffer::EntryBuffer;
use crate::control::{BackpressureController, ControlCommand, Limits};
use crate::filter::{self, Query};
use crate::ingest::IngestPipeline;
use crate::stream::{StreamItem, StreamSupervisor};

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A stream session began (fresh subprocess, fresh framing state).
    Started,
    /// New or extended entries are in the buffer.
    Appended,
    /// The backpressure mode changed.
    ModeChanged(StreamMode),
    /// The buffer was emptied.
    Cleared,
    /// The subprocess stopped producing. Existing entries remain.
    Ended,
    /// A restart attempted on the session's behalf failed.
    Failed(String),
}

/// Read-only view returned by [`LogSession::snapshot`].
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
    /// Entries passing the level floor and text filter, oldest first.
    pub entries: Vec<Entry>,
    /// Indices into `entries` matching the search term.
    pub matches: Vec<usize>,
    /// Current position within `matches`.
    pub current_match: usize,
    pub mode: StreamMode,
    /// Unfiltered buffer length.
    pub total: usize,
}

/// The consumer-facing log-tailing session.
///
/// Owns the buffer, the backpressure controller, the stream supervisor and
/// the query state. Buffer mutation during streaming happens on one spawned
/// ingestion task; consumer-facing calls are serialized against it by the
/// interior locks.
pub struct LogSession {
    finder: Arc<dyn ToolFinder>,
    buffer: EntryBuffer,
    controller: Arc<Mutex<BackpressureController>>,
    supervisor: Arc<Mutex<StreamSupervisor>>,
    pipeline: Arc<Mutex<IngestPipeline>>,
    ingest_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    query: Mutex<Query>,
    current_match: Mutex<usize>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl LogSession {
    /// Build a session and the event stream the presentation layer listens
    /// on.
    pub fn new(
        finder: Arc<dyn ToolFinder>,
        limits: Limits,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let session = Self {
            finder,
            buffer: EntryBuffer::new(),
            controller: Arc::new(Mutex::new(BackpressureController::new(limits))),
            supervisor: Arc::new(Mutex::new(StreamSupervisor::new())),
            pipeline: Arc::new(Mutex::new(IngestPipeline::new())),
            ingest_task: Mutex::new(None),
            query: Mutex::new(Query::default()),
            current_match: Mutex::new(0),
            events,
        };
        (session, event_rx)
    }

    /// Start (or restart) tailing. Existing entries are kept; framing and
    /// assembly state start fresh, and the consumer is pinned back to the
    /// tail with no active search.
    pub fn start(&self) -> Result<(), AdbError> {
        self.halt_ingest();
        self.pipeline.lock().reset();
        let mode_changed = {
            let mut controller = self.controller.lock();
            let before = controller.mode();
            controller.reset_for_start();
            before != controller.mode()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.supervisor.lock().start(self.finder.as_ref(), tx)?;
        self.spawn_ingest(rx);

        let _ = self.events.send(SessionEvent::Started);
        if mode_changed {
            let _ = self.events.send(SessionEvent::ModeChanged(StreamMode::Live));
        }
        Ok(())
    }

    /// Stop the subprocess and reading. Idempotent; entries remain and the
    /// mode stays whatever it was.
    pub fn stop(&self) {
        self.supervisor.lock().stop();
        self.halt_ingest();
    }

    /// Empty the buffer and drop the partial-line carry. Subprocess
    /// liveness is untouched.
    pub fn clear(&self) {
        self.buffer.clear();
        self.pipeline.lock().reset();
        *self.current_match.lock() = 0;
        let _ = self.events.send(SessionEvent::Cleared);
    }

    pub fn set_following_tail(&self, following: bool) {
        self.apply_flag(|controller| controller.set_following_tail(following));
    }

    pub fn set_search_active(&self, active: bool) {
        self.apply_flag(|controller| controller.set_search_active(active));
    }

    pub fn set_level_floor(&self, floor: Level) {
        self.query.lock().level_floor = floor;
    }

    pub fn set_text_filter(&self, text_filter: impl Into<String>) {
        self.query.lock().text_filter = text_filter.into();
        *self.current_match.lock() = 0;
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.query.lock().search_term = term.into();
        *self.current_match.lock() = 0;
    }

    /// Advance to the next search match, wrapping past the end.
    pub fn next_match(&self) -> usize {
        self.step_match(filter::next_match)
    }

    /// Step back to the previous search match, wrapping past the start.
    pub fn prev_match(&self) -> usize {
        self.step_match(filter::prev_match)
    }

    pub fn mode(&self) -> StreamMode {
        self.controller.lock().mode()
    }

    /// The filtered, search-annotated view of the buffer.
    pub fn snapshot(&self) -> SessionSnapshot {
        let total = self.buffer.len();
        let query = self.query.lock().clone();
        let projection = filter::project(self.buffer.snapshot(), &query);

        let mut current = self.current_match.lock();
        if projection.matches.is_empty() {
            *current = 0;
        } else if *current >= projection.matches.len() {
            *current = projection.matches.len() - 1;
        }

        SessionSnapshot {
            current_match: *current,
            mode: self.controller.lock().mode(),
            entries: projection.entries,
            matches: projection.matches,
            total,
        }
    }

    fn step_match(&self, step: impl FnOnce(usize, usize) -> usize) -> usize {
        let query = self.query.lock().clone();
        let projection = filter::project(self.buffer.snapshot(), &query);
        let mut current = self.current_match.lock();
        *current = step(*current, projection.matches.len());
        *current
    }

    /// Run a controller transition, emitting the mode change and executing
    /// any resume command it returns.
    fn apply_flag(
        &self,
        transition: impl FnOnce(&mut BackpressureController) -> Option<ControlCommand>,
    ) {
        let (before, after, command) = {
            let mut controller = self.controller.lock();
            let before = controller.mode();
            let command = transition(&mut controller);
            (before, controller.mode(), command)
        };

        if before != after {
            let _ = self.events.send(SessionEvent::ModeChanged(after));
        }

        if let Some(ControlCommand::Resume { truncate_to }) = command {
            // Truncate to the most recent window first, then bring up a
            // fresh stream session.
            self.buffer.trim_front_to(truncate_to);
            if let Err(err) = self.start() {
                tracing::warn!(%err, "restart after resume failed");
                let _ = self.events.send(SessionEvent::Failed(err.to_string()));
            }
        }
    }

    fn spawn_ingest(&self, mut rx: mpsc::UnboundedReceiver<StreamItem>) {
        let buffer = self.buffer.clone();
        let controller = Arc::clone(&self.controller);
        let supervisor = Arc::clone(&self.supervisor);
        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                match item {
                    StreamItem::Chunk(chunk) => {
                        let outcome = {
                            let mut pipeline = pipeline.lock();
                            let mut controller = controller.lock();
                            pipeline.push_chunk(&chunk, &buffer, &mut controller)
                        };

                        if outcome.appended > 0 {
                            let _ = events.send(SessionEvent::Appended);
                        }
                        if outcome.paused {
                            // Preserving ceiling reached: stop delivery
                            // entirely until the consumer returns to the
                            // tail.
                            supervisor.lock().stop();
                            let _ = events.send(SessionEvent::ModeChanged(StreamMode::Paused));
                            break;
                        }
                    }
                    StreamItem::Ended => {
                        let _ = events.send(SessionEvent::Ended);
                        break;
                    }
                }
            }
        });

        *self.ingest_task.lock() = Some(handle);
    }

    fn halt_ingest(&self) {
        if let Some(task) = self.ingest_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.stop();
    }
}
