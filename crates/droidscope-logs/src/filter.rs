use droidscope_types::{Entry, Level};

/// Filter and search parameters for a projection.
#[derive(Clone, Debug, Default)]
pub struct Query {
    /// Minimum severity. `Silent` is the sentinel floor that hides
    /// everything, level-less lines included.
    pub level_floor: Level,
    /// Case-insensitive substring over the raw text; empty keeps all.
    pub text_filter: String,
    /// Case-insensitive search over the filtered projection; empty matches
    /// nothing.
    pub search_term: String,
}

/// A filtered, search-annotated view of the buffer.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    /// Entries passing the level floor and text filter, oldest first.
    pub entries: Vec<Entry>,
    /// Indices into `entries` whose text contains the search term.
    pub matches: Vec<usize>,
}

/// Project a buffer snapshot through `query`.
///
/// Pure: the same snapshot and query always yield the same projection, and
/// the buffer is never touched. Level-less entries pass any non-Silent
/// floor; they are continuation noise the floor has no opinion on.
pub fn project(entries: Vec<Entry>, query: &Query) -> Projection {
    if query.level_floor == Level::Silent {
        return Projection::default();
    }

    let needle = query.text_filter.to_lowercase();
    let entries: Vec<Entry> = entries
        .into_iter()
        .filter(|e| passes_floor(e.level, query.level_floor))
        .filter(|e| needle.is_empty() || e.raw.to_lowercase().contains(&needle))
        .collect();
    let matches = find_matches(&entries, &query.search_term);

    Projection { entries, matches }
}

fn passes_floor(level: Option<Level>, floor: Level) -> bool {
    level.is_none_or(|l| l >= floor)
}

fn find_matches(entries: &[Entry], term: &str) -> Vec<usize> {
    if term.is_empty() {
        return Vec::new();
    }
    let needle = term.to_lowercase();
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.raw.to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .collect()
}

/// Next match index with wraparound; zero when there are no matches.
pub fn next_match(current: usize, match_count: usize) -> usize {
    if match_count == 0 {
        0
    } else {
        (current + 1) % match_count
    }
}

/// Previous match index with wraparound; zero when there are no matches.
pub fn prev_match(current: usize, match_count: usize) -> usize {
    if match_count == 0 {
        0
    } else {
        (current + match_count - 1) % match_count
    }
}
