// Public modules
pub mod backend;
pub mod client;
pub mod commands;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod observability;
pub mod persistence;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod session;
pub mod sse;
pub mod tui;
pub mod types;
pub mod ui;
pub mod utils;

// Re-exports
pub use backend::{Backend, ChunkStream, GenerationRequest, Uploader};
pub use client::Gemini;
pub use config::{ChatArgs, ChatConfig};
pub use controller::Controller;
pub use coordinator::{CycleOptions, StreamCoordinator};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use persistence::{FileTextWriter, TextWriter};
pub use progress::ProgressTracker;
pub use render::{MarkdownRenderer, Renderer};
pub use session::SessionState;
pub use types::*;
pub use ui::{ChatView, RedrawQueue, UiLoop};
