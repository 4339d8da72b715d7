use regex::Regex;

use droidscope_types::{Entry, Level};

/// Anchored prefix of a logcat record-start line: month-day, time with
/// milliseconds, pid, tid, one priority letter. The rest of the line is
/// free text and is not inspected.
const RECORD_START: &str = r"^\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d+\s+\d+\s+\d+\s+([SVDIWEF])\s";

/// Classifies framed lines as record starts or continuations.
pub struct EntryClassifier {
    record_start: Regex,
}

impl EntryClassifier {
    pub fn new() -> Self {
        Self {
            record_start: Regex::new(RECORD_START).expect("record-start pattern compiles"),
        }
    }

    /// `Some(level)` when the line opens a new record.
    pub fn classify(&self, line: &str) -> Option<Level> {
        let caps = self.record_start.captures(line)?;
        let letter = caps.get(1)?.as_str().chars().next()?;
        Level::from_letter(letter)
    }
}

impl Default for EntryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with a framed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fold {
    /// The line opens a new entry.
    Start(Entry),
    /// The line extends the newest entry.
    Continue(String),
    /// The line carries no information and is dropped.
    Skip,
}

/// Folds classified lines into entry records.
///
/// A non-matching, non-empty line ahead of any record becomes its own
/// level-less entry so nothing visible is lost; blank lines are dropped.
pub struct EntryAssembler {
    classifier: EntryClassifier,
    has_open_entry: bool,
}

impl EntryAssembler {
    pub fn new() -> Self {
        Self {
            classifier: EntryClassifier::new(),
            has_open_entry: false,
        }
    }

    /// Decide how `line` folds into the stream of entries so far.
    pub fn fold(&mut self, line: &str) -> Fold {
        if let Some(level) = self.classifier.classify(line) {
            self.has_open_entry = true;
            return Fold::Start(Entry::new(line.to_string(), Some(level)));
        }

        if line.is_empty() {
            return Fold::Skip;
        }

        if self.has_open_entry {
            Fold::Continue(line.to_string())
        } else {
            self.has_open_entry = true;
            Fold::Start(Entry::new(line.to_string(), None))
        }
    }

    /// Back to start-of-stream state (restart or clear).
    pub fn reset(&mut self) {
        self.has_open_entry = false;
    }
}

impl Default for EntryAssembler {
    fn default() -> Self {
        Self::new()
    }
}
