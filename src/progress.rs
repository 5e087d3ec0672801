/// Running totals for the generation in flight.
///
/// A tracker is created fresh for every cycle and only grows while the cycle
/// runs.  `total_len` counts bytes of chunk text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    chunk_count: usize,
    total_len: usize,
    text: String,
}

impl ProgressTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one chunk.
    pub fn record(&mut self, chunk: &str) {
        self.chunk_count += 1;
        self.total_len += chunk.len();
        self.text.push_str(chunk);
    }

    /// Number of chunks recorded.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Total length of the recorded chunks in bytes.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// The chunks concatenated in arrival order.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns to `{0, 0, ""}`.
    pub fn reset(&mut self) {
        self.chunk_count = 0;
        self.total_len = 0;
        self.text.clear();
    }

    /// The progress line shown while streaming.
    pub fn status_line(&self) -> String {
        format!("Progress: {}/{}", self.chunk_count, self.total_len)
    }
}
