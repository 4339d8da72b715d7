/// Reassembles complete lines from arbitrary text chunks.
///
/// The trailing partial line of each chunk is carried into the next call.
/// The carry never crosses a restart: the supervisor resets the framer
/// whenever a fresh subprocess is spawned.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completes, in order.
    ///
    /// An empty chunk is not a real read and produces nothing. A trailing
    /// `\r` is stripped from completed lines; adb emits CRLF on some
    /// transports.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let combined = std::mem::take(&mut self.pending) + chunk;
        let mut segments: Vec<&str> = combined.split('\n').collect();
        // The final segment is the new carry: empty exactly when the chunk
        // ended on a line boundary.
        let carry = segments.pop().unwrap_or("");
        self.pending = carry.to_string();

        segments
            .into_iter()
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// Drop the partial-line carry (restart or clear).
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}
