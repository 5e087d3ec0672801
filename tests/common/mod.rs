//! Scripted stand-ins for the backend, the uploader and the review writer.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};

use aifun::{
    AttachmentRef, Backend, ChunkStream, Error, GenerationRequest, Result, StreamCoordinator,
    TextWriter, Uploader,
};

/// What the next generation does.
pub enum Reply {
    /// Stream these chunks, then end normally.
    Chunks(Vec<&'static str>),
    /// Stream these chunks, then fail mid-stream.
    FailAfter(Vec<&'static str>),
    /// Refuse to open the generation.
    Refuse,
    /// Stream these chunks, then never finish.
    Stall(Vec<&'static str>),
}

/// A backend that plays back one [`Reply`] per generation.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn owned(chunks: Vec<&'static str>) -> Vec<Result<String>> {
    chunks.into_iter().map(|c| Ok(c.to_string())).collect()
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn open_generation(&self, request: GenerationRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Chunks(vec!["ok"]));
        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(stream::iter(owned(chunks)))),
            Reply::FailAfter(chunks) => {
                let mut items = owned(chunks);
                items.push(Err(Error::streaming("connection reset", None)));
                Ok(Box::pin(stream::iter(items)))
            }
            Reply::Refuse => Err(Error::api(503, Some("UNAVAILABLE".to_string()), "overloaded")),
            Reply::Stall(chunks) => Ok(Box::pin(
                stream::iter(owned(chunks)).chain(stream::pending()),
            )),
        }
    }
}

/// An uploader that hands out a fixed reference, or fails.
pub struct FixedUploader {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub paths: Mutex<Vec<PathBuf>>,
}

pub const FILE_URI: &str = "https://generativelanguage.googleapis.com/v1beta/files/abc123";

impl FixedUploader {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay: None,
            paths: Mutex::new(Vec::new()),
        })
    }

    /// Succeeds after sleeping for `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            delay: Some(delay),
            paths: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            delay: None,
            paths: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl Uploader for FixedUploader {
    async fn upload(&self, path: &Path) -> Result<AttachmentRef> {
        self.paths.lock().unwrap().push(path.to_path_buf());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::attachment("no such file", Some(path), None));
        }
        Ok(AttachmentRef::new(FILE_URI, "text/plain"))
    }
}

/// Records what would have been saved.
#[derive(Default)]
pub struct RecordingWriter {
    pub writes: Mutex<Vec<(String, PathBuf)>>,
}

impl TextWriter for RecordingWriter {
    fn write_text(&self, content: &str, filename: &Path) {
        self.writes
            .lock()
            .unwrap()
            .push((content.to_string(), filename.to_path_buf()));
    }
}

/// A coordinator over `backend` with an uploader and a recording writer.
pub fn coordinator(
    backend: Arc<ScriptedBackend>,
    uploader: Arc<FixedUploader>,
) -> (StreamCoordinator, Arc<RecordingWriter>) {
    let writer = Arc::new(RecordingWriter::default());
    let coordinator = StreamCoordinator::new(backend, uploader).with_writer(writer.clone());
    (coordinator, writer)
}
