use std::path::{Path, PathBuf};

/// Saves final response text.
///
/// Writing is fire-and-forget: implementations report failures through the
/// log and never to the caller.
pub trait TextWriter: Send + Sync {
    /// Overwrite `filename` with `content`.
    fn write_text(&self, content: &str, filename: &Path);
}

/// Writes text to the local filesystem.
///
/// Inside a tokio runtime the write runs on the blocking pool; outside one it
/// runs inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextWriter;

impl TextWriter for FileTextWriter {
    fn write_text(&self, content: &str, filename: &Path) {
        let content = content.to_string();
        let filename = filename.to_path_buf();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || save(&content, &filename));
            }
            Err(_) => save(&content, &filename),
        }
    }
}

fn save(content: &str, filename: &Path) {
    match std::fs::write(filename, content) {
        Ok(()) => {
            tracing::info!(path = %filename.display(), bytes = content.len(), "saved response");
        }
        Err(err) => {
            tracing::warn!(path = %filename.display(), error = %err, "could not save response");
        }
    }
}
