use droidscope_types::StreamMode;

use crate::buffer::EntryBuffer;
use crate::control::{AppendVerdict, BackpressureController};
use crate::framer::LineFramer;
use crate::parser::{EntryAssembler, Fold};

/// Outcome of one ingestion step, for the session to act on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Entries created or extended this step.
    pub appended: usize,
    /// Entries dropped from the front under the live ceiling.
    pub trimmed: usize,
    /// The preserving ceiling was hit; the caller must stop delivery.
    pub paused: bool,
}

/// The single-mutator ingestion step: framer -> assembler -> buffer ->
/// controller verdict. All buffer mutation during streaming happens through
/// `push_chunk`, on the one task that owns the stream's receive end.
#[derive(Default)]
pub struct IngestPipeline {
    framer: LineFramer,
    assembler: EntryAssembler,
}

impl IngestPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded chunk through the pipeline.
    ///
    /// The capacity invariant holds again by the time this returns: either
    /// the buffer was trimmed to the live ceiling, or `paused` tells the
    /// caller to stop delivery with the buffer frozen at the preserving
    /// ceiling.
    pub fn push_chunk(
        &mut self,
        chunk: &str,
        buffer: &EntryBuffer,
        controller: &mut BackpressureController,
    ) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        if controller.mode() == StreamMode::Paused {
            // Delivery should already be detached; drop stragglers.
            return outcome;
        }

        for line in self.framer.push_chunk(chunk) {
            if controller.mode() == StreamMode::Paused {
                tracing::debug!("discarding framed lines behind a pause");
                break;
            }
            match self.assembler.fold(&line) {
                Fold::Start(entry) => {
                    let len = buffer.push(entry);
                    outcome.appended += 1;
                    match controller.after_append(len) {
                        AppendVerdict::Retain => {}
                        AppendVerdict::TrimTo(ceiling) => {
                            outcome.trimmed += buffer.trim_front_to(ceiling);
                        }
                        AppendVerdict::Pause => {
                            outcome.paused = true;
                        }
                    }
                }
                Fold::Continue(line) => {
                    if buffer.append_to_newest(&line) {
                        outcome.appended += 1;
                    }
                }
                Fold::Skip => {}
            }
        }

        outcome
    }

    /// Fresh framing and assembly state for a new stream session or a
    /// cleared buffer.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.assembler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Limits;
    use droidscope_types::Level;

    fn record(index: usize, letter: char) -> String {
        format!("01-01 00:00:{:02}.000 10 20 {letter} tag : message {index}\n", index % 60)
    }

    fn pipeline_with(normal_max: usize) -> (IngestPipeline, EntryBuffer, BackpressureController) {
        (
            IngestPipeline::new(),
            EntryBuffer::new(),
            BackpressureController::new(Limits::new(normal_max)),
        )
    }

    #[test]
    fn live_appends_respect_the_trim_invariant() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(3);

        for i in 0..10 {
            pipeline.push_chunk(&record(i, 'I'), &buffer, &mut controller);
            assert!(buffer.len() <= 3, "len {} after append {i}", buffer.len());
        }

        let kept: Vec<String> = buffer.snapshot().into_iter().map(|e| e.raw).collect();
        assert_eq!(kept.len(), 3);
        assert!(kept[2].ends_with("message 9"));
    }

    #[test]
    fn continuation_folding_produces_two_entries() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(100);

        let text = "01-01 00:00:00.000 1 1 I tag : first\n  stack frame 1\n01-01 00:00:00.001 1 1 E tag2 : second\n";
        pipeline.push_chunk(text, &buffer, &mut controller);

        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Some(Level::Info));
        assert_eq!(entries[0].line_count(), 2);
        assert_eq!(entries[1].level, Some(Level::Error));
        assert_eq!(entries[1].line_count(), 1);
    }

    #[test]
    fn continuations_fold_across_chunk_boundaries() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(100);

        pipeline.push_chunk("01-01 00:00:00.000 1 1 W tag : head\n  fra", &buffer, &mut controller);
        pipeline.push_chunk("me one\n", &buffer, &mut controller);

        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].raw, "01-01 00:00:00.000 1 1 W tag : head\n  frame one");
    }

    #[test]
    fn preserving_fills_to_the_paused_ceiling_then_stops() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(2);
        controller.set_following_tail(false);
        let paused_max = controller.limits().paused_max();

        let mut paused_at = None;
        for i in 0..paused_max * 2 {
            let outcome = pipeline.push_chunk(&record(i, 'D'), &buffer, &mut controller);
            assert!(buffer.len() <= paused_max);
            if outcome.paused {
                paused_at = Some(i);
                break;
            }
        }

        assert_eq!(paused_at, Some(paused_max - 1));
        assert_eq!(buffer.len(), paused_max);

        // Everything delivered after the pause is refused
        let outcome = pipeline.push_chunk(&record(99, 'D'), &buffer, &mut controller);
        assert_eq!(outcome, IngestOutcome::default());
        assert_eq!(buffer.len(), paused_max);
    }

    #[test]
    fn resume_truncates_to_the_most_recent_normal_max() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(2);
        controller.set_following_tail(false);
        let paused_max = controller.limits().paused_max();

        for i in 0..paused_max {
            pipeline.push_chunk(&record(i, 'V'), &buffer, &mut controller);
        }
        assert_eq!(buffer.len(), paused_max);

        let command = controller.set_following_tail(true);
        let Some(crate::control::ControlCommand::Resume { truncate_to }) = command else {
            panic!("expected a resume command, got {command:?}");
        };
        buffer.trim_front_to(truncate_to);

        assert_eq!(buffer.len(), 2);
        let kept: Vec<String> = buffer.snapshot().into_iter().map(|e| e.raw).collect();
        assert!(kept[1].ends_with(&format!("message {}", paused_max - 1)));
    }

    #[test]
    fn restart_resets_framing_without_losing_entries() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(100);

        pipeline.push_chunk("01-01 00:00:00.000 1 1 I tag : kept\npartial tai", &buffer, &mut controller);
        assert_eq!(buffer.len(), 1);

        // stop() + start(): fresh framer and assembler, same buffer
        pipeline.reset();
        pipeline.push_chunk(&record(1, 'E'), &buffer, &mut controller);

        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 2);
        // The carried partial from the old session never surfaces
        assert_eq!(entries[0].raw, "01-01 00:00:00.000 1 1 I tag : kept");
    }

    #[test]
    fn blank_lines_between_records_are_dropped() {
        let (mut pipeline, buffer, mut controller) = pipeline_with(100);
        pipeline.push_chunk("\n\n01-01 00:00:00.000 1 1 I tag : one\n\n", &buffer, &mut controller);

        let entries = buffer.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line_count(), 1);
    }
}
