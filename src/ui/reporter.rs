use std::sync::Arc;

use tokio::sync::mpsc;

use crate::progress::ProgressTracker;
use crate::render::{Renderer, render_or_raw};
use crate::ui::RedrawQueue;
use crate::{Error, Result};

/// Shown in place of the response when a cycle is cancelled.
pub const CANCELLED_MARKER: &str = "[cancelled]";

/// Turns the chunks of one cycle into queued redraws.
///
/// Runs on the cycle's background task.  [`pump`](Self::pump) submits one
/// redraw per chunk; [`finish`](Self::finish) submits the single terminal
/// redraw.
#[derive(Clone)]
pub struct CycleReporter {
    queue: RedrawQueue,
    renderer: Arc<dyn Renderer>,
}

impl CycleReporter {
    pub fn new(queue: RedrawQueue, renderer: Arc<dyn Renderer>) -> Self {
        Self { queue, renderer }
    }

    /// Consume chunks until the sender is dropped.
    ///
    /// Each redraw carries the progress line and the rendered text accumulated
    /// so far, so applying them in order never shows a shorter text after a
    /// longer one.
    pub async fn pump(&self, mut chunks: mpsc::UnboundedReceiver<String>) -> ProgressTracker {
        let mut tracker = ProgressTracker::new();
        while let Some(chunk) = chunks.recv().await {
            tracker.record(&chunk);
            let progress = tracker.status_line();
            let provisional = render_or_raw(self.renderer.as_ref(), tracker.text());
            self.queue.submit(move |view| {
                view.set_progress(progress);
                view.set_provisional(provisional);
            });
        }
        tracker
    }

    /// Submit the terminal redraw for `outcome`.
    ///
    /// The partial output and the progress line are cleared in the same
    /// redraw that shows the final text or the error.
    pub fn finish(&self, outcome: &Result<String>, history_len: usize) {
        let block = match outcome {
            Ok(text) => render_or_raw(self.renderer.as_ref(), text),
            Err(Error::Cancelled { .. }) => CANCELLED_MARKER.to_string(),
            Err(err) => format!("Error: {err}"),
        };
        let committed = outcome.is_ok();
        self.queue.submit(move |view| {
            view.clear_provisional();
            view.clear_progress();
            view.append(block);
            if committed {
                view.set_history_len(history_len);
            }
            view.set_busy(false);
        });
    }
}
