//! The UI event loop and its redraw queue.
//!
//! Background tasks never touch the [`ChatView`].  They submit boxed closures
//! to a [`RedrawQueue`]; the [`UiLoop`] is the single consumer and applies
//! them strictly in submission order.

pub mod reporter;
pub mod view;

pub use reporter::CycleReporter;
pub use view::ChatView;

use tokio::sync::mpsc;

/// A queued unit of UI work.
pub type Redraw = Box<dyn FnOnce(&mut ChatView) + Send>;

/// Producer side of the redraw queue.
#[derive(Clone)]
pub struct RedrawQueue {
    tx: mpsc::UnboundedSender<Redraw>,
}

impl RedrawQueue {
    /// Queue `redraw`.  Returns false once the UI loop has gone away.
    pub fn submit(&self, redraw: impl FnOnce(&mut ChatView) + Send + 'static) -> bool {
        self.tx.send(Box::new(redraw)).is_ok()
    }
}

impl std::fmt::Debug for RedrawQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrawQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Single consumer of the redraw queue; owns the view.
pub struct UiLoop {
    view: ChatView,
    rx: mpsc::UnboundedReceiver<Redraw>,
}

impl UiLoop {
    /// Creates a loop over an empty view and the queue that feeds it.
    pub fn new() -> (Self, RedrawQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                view: ChatView::new(),
                rx,
            },
            RedrawQueue { tx },
        )
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Mutable access for input handling on the UI thread itself.
    pub fn view_mut(&mut self) -> &mut ChatView {
        &mut self.view
    }

    /// Apply every redraw queued so far.  Never blocks.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(redraw) = self.rx.try_recv() {
            redraw(&mut self.view);
            applied += 1;
        }
        applied
    }

    /// Wait for the next redraw, then apply it and anything queued behind it.
    ///
    /// Returns false once every [`RedrawQueue`] has been dropped.
    pub async fn wait(&mut self) -> bool {
        match self.rx.recv().await {
            Some(redraw) => {
                redraw(&mut self.view);
                self.apply_pending();
                true
            }
            None => false,
        }
    }
}
