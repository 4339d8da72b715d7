//! Shared types for droidscope
//!
//! This crate contains data structures used across multiple droidscope crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Severity
// ============================================================================

/// Log severity level, parsed from the logcat priority letter.
///
/// Ordered by ascending urgency. `Silent` sorts below everything and acts as
/// a sentinel filter floor: a floor of `Silent` shows nothing at all.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Silent,
    #[default]
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// Parse the single priority letter found in a record-start line.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'S' => Some(Self::Silent),
            'V' => Some(Self::Verbose),
            'D' => Some(Self::Debug),
            'I' => Some(Self::Info),
            'W' => Some(Self::Warning),
            'E' => Some(Self::Error),
            'F' => Some(Self::Fatal),
            _ => None,
        }
    }

    /// The logcat priority letter for this level.
    pub fn letter(&self) -> char {
        match self {
            Self::Silent => 'S',
            Self::Verbose => 'V',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warning => 'W',
            Self::Error => 'E',
            Self::Fatal => 'F',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "s" => Ok(Self::Silent),
            "verbose" | "v" => Ok(Self::Verbose),
            "debug" | "d" => Ok(Self::Debug),
            "info" | "i" => Ok(Self::Info),
            "warning" | "warn" | "w" => Ok(Self::Warning),
            "error" | "err" | "e" => Ok(Self::Error),
            "fatal" | "f" => Ok(Self::Fatal),
            other => Err(format!("unknown level `{other}`")),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One logical record assembled from the stream.
///
/// Continuation lines (stack frames and similar) are folded into `raw` while
/// they keep arriving; the entry stops growing once the next record-start
/// line shows up or the buffer is cleared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Sequential id assigned by the buffer on append.
    pub id: u64,

    /// Raw text; newline-joined when continuation lines were folded in.
    pub raw: String,

    /// Severity parsed from the record-start line. `None` means the first
    /// line did not match the record-start pattern (stream noise, or a
    /// continuation of an undetected prior record).
    pub level: Option<Level>,

    /// Arrival time of the first line.
    pub received_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(raw: String, level: Option<Level>) -> Self {
        Self {
            id: 0,
            raw,
            level,
            received_at: Utc::now(),
        }
    }

    /// Fold a continuation line into this entry.
    pub fn push_line(&mut self, line: &str) {
        self.raw.push('\n');
        self.raw.push_str(line);
    }

    /// The record-start line (or the whole text for single-line entries).
    pub fn first_line(&self) -> &str {
        self.raw.lines().next().unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.raw.lines().count()
    }
}

// ============================================================================
// Stream mode
// ============================================================================

/// Ingestion mode, driven by the backpressure controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Consumer is following the tail; the buffer trims to the normal bound.
    #[default]
    Live,
    /// Consumer needs history stable; no trimming, larger bound.
    Preserving,
    /// The preserving bound was reached; ingestion is stopped.
    Paused,
}

impl StreamMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Preserving => "preserving",
            Self::Paused => "paused",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_is_ascending_urgency() {
        assert!(Level::Silent < Level::Verbose);
        assert!(Level::Verbose < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn level_letter_round_trip() {
        for level in [
            Level::Silent,
            Level::Verbose,
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
            Level::Fatal,
        ] {
            assert_eq!(Level::from_letter(level.letter()), Some(level));
        }
        assert_eq!(Level::from_letter('X'), None);
        assert_eq!(Level::from_letter('v'), None);
    }

    #[test]
    fn level_parses_names_and_letters() {
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("warn".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("E".parse::<Level>(), Ok(Level::Error));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn entry_folds_continuation_lines() {
        let mut entry = Entry::new("first".to_string(), Some(Level::Info));
        entry.push_line("  at frame one");
        entry.push_line("  at frame two");

        assert_eq!(entry.raw, "first\n  at frame one\n  at frame two");
        assert_eq!(entry.first_line(), "first");
        assert_eq!(entry.line_count(), 3);
    }
}
