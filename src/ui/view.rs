/// Everything the chat screen shows.
///
/// Owned by the UI loop.  Background tasks change it only through queued
/// redraws.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    transcript: Vec<String>,
    provisional: String,
    progress: String,
    status: String,
    history_len: usize,
    busy: bool,
    scroll: u16,
    /// Text typed into the input box.
    pub input: String,
}

impl ChatView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed blocks of display text, oldest first.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// The transcript as one string.
    pub fn transcript_text(&self) -> String {
        self.transcript.concat()
    }

    /// Appends a block to the transcript.
    pub fn append(&mut self, text: impl Into<String>) {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        self.transcript.push(text);
    }

    /// Rendered partial output of the cycle in flight.
    pub fn provisional(&self) -> &str {
        &self.provisional
    }

    /// Replaces the partial output.
    pub fn set_provisional(&mut self, text: impl Into<String>) {
        self.provisional = text.into();
    }

    /// Discards the partial output.
    pub fn clear_provisional(&mut self) {
        self.provisional.clear();
    }

    /// The progress line.
    pub fn progress(&self) -> &str {
        &self.progress
    }

    /// Replaces the progress line.
    pub fn set_progress(&mut self, text: impl Into<String>) {
        self.progress = text.into();
    }

    /// Clears the progress line.
    pub fn clear_progress(&mut self) {
        self.progress.clear();
    }

    /// One-line status message.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replaces the status message.
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }

    /// Number of committed turns, as last reported by the coordinator.
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn set_history_len(&mut self, len: usize) {
        self.history_len = len;
    }

    /// Whether a cycle is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Lines scrolled back from the bottom of the output pane.
    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Drops the transcript and any partial output.
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.provisional.clear();
        self.progress.clear();
        self.history_len = 0;
        self.scroll = 0;
    }
}
