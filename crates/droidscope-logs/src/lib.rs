//! Log ingestion core for droidscope
//!
//! Chunks from the `adb logcat` subprocess flow one way through this crate:
//! line framer -> entry classifier/assembler -> bounded buffer, mutated under
//! the backpressure controller's policy, then projected read-only by the
//! query view. Control flows the other way: consumer flags feed the
//! controller, which may stop or restart the stream supervisor.

mod buffer;
mod control;
mod filter;
mod framer;
mod ingest;
mod parser;
mod session;
mod stream;

pub use buffer::EntryBuffer;
pub use control::{
    AppendVerdict, BackpressureController, ControlCommand, DEFAULT_NORMAL_MAX, Limits,
};
pub use filter::{Projection, Query, next_match, prev_match, project};
pub use framer::LineFramer;
pub use ingest::{IngestOutcome, IngestPipeline};
pub use parser::{EntryAssembler, EntryClassifier, Fold};
pub use session::{LogSession, SessionEvent, SessionSnapshot};
pub use stream::{StreamItem, StreamSupervisor};
