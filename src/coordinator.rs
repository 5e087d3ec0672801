//! The stream coordinator: one request/response cycle at a time.
//!
//! A cycle builds the outgoing request from a snapshot of the session, opens a
//! generation on the [`Backend`], forwards every chunk in arrival order to a
//! channel, and commits to the [`SessionState`] only after the stream has
//! ended normally.  Errors, cancellation and deadline expiry all leave the
//! session exactly as it was.
//!
//! Every cycle operation takes `&mut self`, so holding the coordinator
//! exclusively is what makes a cycle the only one in flight.  See
//! [`crate::controller::Controller`] for how the UI side enforces that.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, GenerationRequest, Uploader};
use crate::observability::{
    CYCLE_CHUNK_BYTES, CYCLE_CHUNKS, CYCLE_DURATION, CYCLES_CANCELLED, CYCLES_COMMITTED,
    CYCLES_FAILED, CYCLES_STARTED,
};
use crate::persistence::{FileTextWriter, TextWriter};
use crate::session::SessionState;
use crate::types::Part;
use crate::{Error, Result};

/// Receives the text of every chunk, in arrival order.
pub type ChunkSender = mpsc::UnboundedSender<String>;

/// Sent in place of a user message to have the model introduce itself.
pub const INTRODUCTION_COMMAND: &str = "Hi - please introduce yourself";

/// Instruction sent alongside a reviewed attachment.  `{fileUri}` is replaced
/// by the attachment's URI.
pub const REVIEW_TEMPLATE: &str = "* Do not include the provided diff output in the response.\n\nThe file {fileUri} contains the git diff output to be reviewed.\n\nAI OUTPUT:";

/// Attachment reviewed when no path is given.
pub const DEFAULT_REVIEW_FILE: &str = "gitdiff.txt";

/// File the final text of a review is written to.
pub const DEFAULT_REVIEW_OUTPUT: &str = "codereview.md";

/// Fill [`REVIEW_TEMPLATE`] with `uri`.
pub fn review_command(uri: &str) -> String {
    REVIEW_TEMPLATE.replacen("{fileUri}", uri, 1)
}

/// Per-cycle controls.
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// Cancelling this token aborts the cycle.
    pub cancel: CancellationToken,
    /// Abort the cycle if it runs longer than this.
    pub deadline: Option<Duration>,
}

impl CycleOptions {
    /// Options with a fresh token and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The instant a cycle started now must finish by.
    fn expires_at(&self) -> Option<tokio::time::Instant> {
        self.deadline.map(|deadline| tokio::time::Instant::now() + deadline)
    }
}

/// Drives generation cycles against a backend and commits their results.
pub struct StreamCoordinator {
    session: SessionState,
    backend: Arc<dyn Backend>,
    uploader: Arc<dyn Uploader>,
    writer: Arc<dyn TextWriter>,
    review_file: PathBuf,
    review_output: PathBuf,
}

impl StreamCoordinator {
    /// Creates a coordinator over an empty session.
    pub fn new(backend: Arc<dyn Backend>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            session: SessionState::new(),
            backend,
            uploader,
            writer: Arc::new(FileTextWriter),
            review_file: PathBuf::from(DEFAULT_REVIEW_FILE),
            review_output: PathBuf::from(DEFAULT_REVIEW_OUTPUT),
        }
    }

    /// Replaces the session the coordinator writes to.
    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    /// Replaces the writer reviews are saved through.
    pub fn with_writer(mut self, writer: Arc<dyn TextWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Sets the attachment reviewed when no path is given.
    pub fn with_review_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.review_file = path.into();
        self
    }

    /// Sets the file reviews are saved to.
    pub fn with_review_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.review_output = path.into();
        self
    }

    /// Read access to the session.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The attachment reviewed when no path is given.
    pub fn review_file(&self) -> &Path {
        &self.review_file
    }

    /// Replaces the system instruction for later cycles.
    pub fn set_system_instruction(&mut self, text: impl Into<String>) {
        self.session.set_system_instruction(text);
        tracing::info!("system instruction replaced");
    }

    /// Drops the whole history.
    pub fn reset(&mut self) {
        self.session.reset();
        tracing::info!("session reset");
    }

    /// Sends `prompt` and, on success, commits the user and model turns.
    pub async fn send_message(
        &mut self,
        prompt: &str,
        on_chunk: &ChunkSender,
        options: &CycleOptions,
    ) -> Result<String> {
        let request = GenerationRequest::text(
            self.session.system_instruction(),
            self.session.history(),
            prompt,
        );
        let full_text = self
            .run_cycle("message", request, on_chunk, options, options.expires_at())
            .await?;
        self.session.append_user_turn(prompt);
        self.session.append_model_turn(full_text.clone());
        self.committed("message", &full_text);
        Ok(full_text)
    }

    /// Has the model introduce itself.  Only the model turn is committed.
    pub async fn send_system_prompt(
        &mut self,
        on_chunk: &ChunkSender,
        options: &CycleOptions,
    ) -> Result<String> {
        let request = GenerationRequest::text(
            self.session.system_instruction(),
            self.session.history(),
            INTRODUCTION_COMMAND,
        );
        let full_text = self
            .run_cycle("introduction", request, on_chunk, options, options.expires_at())
            .await?;
        self.session.append_model_turn(full_text.clone());
        self.committed("introduction", &full_text);
        Ok(full_text)
    }

    /// Uploads an attachment and asks for a review of it.
    ///
    /// `path` defaults to the configured review file.  On success the command
    /// text and the model turn are committed and the final text is written to
    /// the review output file.  The upload counts against the cycle deadline.
    pub async fn review_attachment(
        &mut self,
        path: Option<&Path>,
        on_chunk: &ChunkSender,
        options: &CycleOptions,
    ) -> Result<String> {
        let path = path.unwrap_or(self.review_file.as_path()).to_path_buf();
        tracing::info!(path = %path.display(), "reviewing attachment");
        let expires = options.expires_at();
        let reference = guarded(options, expires, self.uploader.upload(&path)).await?;
        let command = review_command(reference.uri());
        let request = GenerationRequest {
            system_instruction: self.session.system_instruction().to_string(),
            history: self.session.history(),
            new_parts: vec![Part::Attachment(reference.clone()), Part::text(&command)],
        };
        let full_text = self
            .run_cycle("review", request, on_chunk, options, expires)
            .await?;
        self.session.append_attachment_turn(&reference, &command);
        self.session.append_model_turn(full_text.clone());
        self.committed("review", &full_text);
        self.writer.write_text(&full_text, &self.review_output);
        Ok(full_text)
    }

    fn committed(&self, kind: &'static str, full_text: &str) {
        CYCLES_COMMITTED.click();
        tracing::info!(
            kind,
            bytes = full_text.len(),
            history = self.session.len(),
            "cycle committed"
        );
    }

    async fn run_cycle(
        &self,
        kind: &'static str,
        request: GenerationRequest,
        on_chunk: &ChunkSender,
        options: &CycleOptions,
        expires: Option<tokio::time::Instant>,
    ) -> Result<String> {
        CYCLES_STARTED.click();
        tracing::info!(kind, history = request.history.len(), "cycle started");
        let start = Instant::now();
        let result = guarded(options, expires, self.stream(request, on_chunk)).await;
        CYCLE_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {}
            Err(err) if err.is_cancelled() => {
                CYCLES_CANCELLED.click();
                tracing::info!(kind, "cycle cancelled");
            }
            Err(err) => {
                CYCLES_FAILED.click();
                tracing::warn!(kind, error = %err, "cycle failed");
            }
        }
        result
    }

    async fn stream(&self, request: GenerationRequest, on_chunk: &ChunkSender) -> Result<String> {
        let mut chunks = self.backend.open_generation(request).await?;
        let mut full_text = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            CYCLE_CHUNKS.click();
            CYCLE_CHUNK_BYTES.count(chunk.len() as u64);
            tracing::trace!(len = chunk.len(), "chunk");
            full_text.push_str(&chunk);
            // The receiver going away must not abort the cycle.
            let _ = on_chunk.send(chunk);
        }
        Ok(full_text)
    }
}

/// Run `work` under the cycle's cancellation token and expiry instant.
async fn guarded<T>(
    options: &CycleOptions,
    expires: Option<tokio::time::Instant>,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    let bounded = async {
        match (expires, options.deadline) {
            (Some(expires), Some(deadline)) => match tokio::time::timeout_at(expires, work).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(
                    "generation deadline exceeded",
                    Some(deadline.as_secs_f64()),
                )),
            },
            _ => work.await,
        }
    };
    tokio::select! {
        biased;
        _ = options.cancel.cancelled() => Err(Error::cancelled("cycle cancelled")),
        result = bounded => result,
    }
}
