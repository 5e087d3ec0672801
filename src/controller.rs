//! The UI thread's handle on the stream coordinator.
//!
//! The coordinator lives behind an async mutex.  Starting a cycle takes the
//! lock with `try_lock_owned` and moves the guard into the background task;
//! while that task runs every other start fails fast with
//! [`Error::InProgress`].  Submissions are rejected, never queued.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{CycleOptions, StreamCoordinator};
use crate::observability::CYCLES_REJECTED;
use crate::progress::ProgressTracker;
use crate::render::{Renderer, echo_or_raw};
use crate::types::Turn;
use crate::ui::{CycleReporter, RedrawQueue};
use crate::{Error, Result};

enum CycleKind {
    Message(String),
    Review(Option<PathBuf>),
    Introduction,
}

/// Starts cycles on background tasks and routes their output to the UI.
#[derive(Clone)]
pub struct Controller {
    coordinator: Arc<tokio::sync::Mutex<StreamCoordinator>>,
    queue: RedrawQueue,
    renderer: Arc<dyn Renderer>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
    deadline: Option<Duration>,
}

impl Controller {
    pub fn new(
        coordinator: StreamCoordinator,
        queue: RedrawQueue,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            coordinator: Arc::new(tokio::sync::Mutex::new(coordinator)),
            queue,
            renderer,
            cancel: Arc::new(Mutex::new(None)),
            deadline: None,
        }
    }

    /// Bound every cycle by `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Send `text` as a user message.
    pub fn submit_prompt(&self, text: impl Into<String>) -> Result<JoinHandle<Result<String>>> {
        let text = text.into();
        self.start(CycleKind::Message(text.clone()), Some(text))
    }

    /// Review an attachment; `None` reviews the configured file.
    pub fn review_attachment(&self, path: Option<PathBuf>) -> Result<JoinHandle<Result<String>>> {
        let echo = match &path {
            Some(path) => format!("review {}", path.display()),
            None => "review".to_string(),
        };
        self.start(CycleKind::Review(path), Some(echo))
    }

    /// Have the model introduce itself.
    pub fn introduce(&self) -> Result<JoinHandle<Result<String>>> {
        self.start(CycleKind::Introduction, None)
    }

    /// Replace the system instruction.  Fails while a cycle is in flight.
    pub fn set_system_instruction(&self, text: impl Into<String>) -> Result<()> {
        let mut coordinator = self.lock()?;
        coordinator.set_system_instruction(text);
        Ok(())
    }

    /// The current system instruction.  Fails while a cycle is in flight.
    pub fn system_instruction(&self) -> Result<String> {
        Ok(self.lock()?.session().system_instruction().to_string())
    }

    /// Snapshot of the history.  Fails while a cycle is in flight.
    pub fn history(&self) -> Result<Vec<Turn>> {
        Ok(self.lock()?.session().history())
    }

    /// Drop the history and clear the transcript.  Fails while a cycle is in
    /// flight.
    pub fn reset(&self) -> Result<()> {
        let mut coordinator = self.lock()?;
        coordinator.reset();
        self.queue.submit(|view| view.clear());
        Ok(())
    }

    /// Cancel the cycle in flight.  Returns false if there was none.
    pub fn cancel(&self) -> bool {
        let token = match self.cancel.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match token {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Whether a cycle is in flight.
    pub fn is_busy(&self) -> bool {
        self.coordinator.try_lock().is_err()
    }

    fn lock(&self) -> Result<tokio::sync::MutexGuard<'_, StreamCoordinator>> {
        self.coordinator.try_lock().map_err(|_| {
            CYCLES_REJECTED.click();
            Error::in_progress("a generation is already running")
        })
    }

    fn start(
        &self,
        kind: CycleKind,
        echo: Option<String>,
    ) -> Result<JoinHandle<Result<String>>> {
        let mut coordinator = self.coordinator.clone().try_lock_owned().map_err(|_| {
            CYCLES_REJECTED.click();
            tracing::debug!("rejected submission while a cycle is in flight");
            Error::in_progress("a generation is already running")
        })?;

        if let Some(text) = echo {
            let echo = echo_or_raw(
                self.renderer.as_ref(),
                &text,
                coordinator.session().len(),
            );
            self.queue.submit(move |view| view.append(echo));
        }
        let idle = ProgressTracker::new().status_line();
        self.queue.submit(move |view| {
            view.set_busy(true);
            view.set_progress(idle);
        });

        let token = CancellationToken::new();
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = Some(token.clone());
        }
        let options = CycleOptions::new()
            .with_cancel(token)
            .with_deadline(self.deadline);
        let reporter = CycleReporter::new(self.queue.clone(), self.renderer.clone());
        let cancel = self.cancel.clone();

        Ok(tokio::spawn(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            let cycle = async move {
                let result = match &kind {
                    CycleKind::Message(text) => {
                        coordinator.send_message(text, &tx, &options).await
                    }
                    CycleKind::Review(path) => {
                        coordinator
                            .review_attachment(path.as_deref(), &tx, &options)
                            .await
                    }
                    CycleKind::Introduction => coordinator.send_system_prompt(&tx, &options).await,
                };
                // Closing the channel ends the reporter's pump.
                drop(tx);
                (result, coordinator)
            };
            let ((result, coordinator), _) = tokio::join!(cycle, reporter.pump(rx));
            reporter.finish(&result, coordinator.session().len());
            if let Ok(mut slot) = cancel.lock() {
                *slot = None;
            }
            drop(coordinator);
            result
        }))
    }
}
