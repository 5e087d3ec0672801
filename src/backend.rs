//! The seams between the stream coordinator and the generative service.
//!
//! The coordinator never talks HTTP itself.  It opens generations through a
//! [`Backend`] and turns local files into [`AttachmentRef`]s through an
//! [`Uploader`].  The [`crate::Gemini`] client implements both; tests script
//! their own.

use std::path::Path;
use std::pin::Pin;

use futures::Stream;

use crate::Result;
use crate::types::{AttachmentRef, Part, Turn};

/// A finite, ordered sequence of text chunks.
///
/// The stream ends normally when the backend has nothing more to say; an
/// `Err` item is a mid-stream failure and nothing after it is read.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Everything the backend needs to open one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Standing instruction for the model; empty means none.
    pub system_instruction: String,
    /// Snapshot of the conversation so far.
    pub history: Vec<Turn>,
    /// The parts of the new user message.  Empty for an introduction.
    pub new_parts: Vec<Part>,
}

impl GenerationRequest {
    /// A request carrying the given history and a single text message.
    pub fn text(
        system_instruction: impl Into<String>,
        history: Vec<Turn>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history,
            new_parts: vec![Part::text(text)],
        }
    }
}

/// Opens streaming generations.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Open a generation.  Errors returned here mean no chunk was produced.
    async fn open_generation(&self, request: GenerationRequest) -> Result<ChunkStream>;
}

/// Uploads local files so that messages can refer to them.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the file at `path`.  Every failure is an attachment error.
    async fn upload(&self, path: &Path) -> Result<AttachmentRef>;
}
