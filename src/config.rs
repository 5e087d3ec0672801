//! Configuration types for the aifun binaries.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration both binaries share.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::coordinator::{DEFAULT_REVIEW_FILE, DEFAULT_REVIEW_OUTPUT};
use crate::logging::DEFAULT_LOG_FILE;
use crate::prompts::{self, NamedPrompt};
use crate::types::Model;
use crate::Result;

/// Command-line arguments for the aifun tools.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.0-flash)", "MODEL")]
    pub model: Option<String>,

    /// System instruction to set context for the conversation.
    #[arrrg(optional, "System instruction for the conversation", "TEXT")]
    pub system: Option<String>,

    /// Catalog entry to use as system instruction.
    #[arrrg(optional, "Use catalog prompt N as system instruction", "N")]
    pub prompt: Option<usize>,

    /// YAML file replacing the built-in prompt catalog.
    #[arrrg(optional, "YAML prompt catalog to use instead of the built-in one", "FILE")]
    pub prompts_file: Option<String>,

    /// Attachment reviewed by default.
    #[arrrg(optional, "Diff to review (default: gitdiff.txt)", "FILE")]
    pub review_file: Option<String>,

    /// Where reviews are saved.
    #[arrrg(optional, "File reviews are saved to (default: codereview.md)", "FILE")]
    pub review_output: Option<String>,

    /// Per-cycle deadline.
    #[arrrg(optional, "Abort a response after this many seconds", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Log destination.
    #[arrrg(optional, "Log file (default: aifun.log)", "FILE")]
    pub log_file: Option<String>,

    /// API endpoint override.
    #[arrrg(optional, "Base URL of the generative-language API", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Explicit system instruction; wins over `prompt_index`.
    pub system_instruction: Option<String>,

    /// 1-based catalog entry to use as system instruction.
    pub prompt_index: Option<usize>,

    /// Catalog file replacing the built-in prompts.
    pub prompts_file: Option<PathBuf>,

    /// Attachment reviewed when no path is given.
    pub review_file: PathBuf,

    /// File the final text of a review is saved to.
    pub review_output: PathBuf,

    /// Per-cycle deadline.  `None` waits as long as the backend streams.
    pub deadline: Option<Duration>,

    /// Log destination.
    pub log_file: PathBuf,

    /// API endpoint override.
    pub base_url: Option<String>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.0-flash
    /// - Review file: gitdiff.txt, saved to codereview.md
    /// - Deadline: none
    /// - Log file: aifun.log
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_instruction: None,
            prompt_index: None,
            prompts_file: None,
            review_file: PathBuf::from(DEFAULT_REVIEW_FILE),
            review_output: PathBuf::from(DEFAULT_REVIEW_OUTPUT),
            deadline: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            base_url: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, text: String) -> Self {
        self.system_instruction = Some(text);
        self
    }

    /// Selects a catalog entry.
    pub fn with_prompt_index(mut self, n: Option<usize>) -> Self {
        self.prompt_index = n;
        self
    }

    /// Sets the review file and the file reviews are saved to.
    pub fn with_review_files(mut self, file: PathBuf, output: PathBuf) -> Self {
        self.review_file = file;
        self.review_output = output;
        self
    }

    /// Sets the per-cycle deadline.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Load the prompt catalog this configuration points at.
    pub fn catalog(&self) -> Result<Vec<NamedPrompt>> {
        prompts::catalog(self.prompts_file.as_deref())
    }

    /// The system instruction chosen on the command line, if any.
    ///
    /// An explicit instruction wins over a catalog selection.
    pub fn chosen_instruction(&self, catalog: &[NamedPrompt]) -> Result<Option<String>> {
        if let Some(text) = &self.system_instruction {
            return Ok(Some(text.clone()));
        }
        match self.prompt_index {
            Some(n) => Ok(Some(prompts::select(catalog, n)?.prompt.clone())),
            None => Ok(None),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or_default();
        let defaults = ChatConfig::new();

        ChatConfig {
            model,
            system_instruction: args.system,
            prompt_index: args.prompt,
            prompts_file: args.prompts_file.map(PathBuf::from),
            review_file: args
                .review_file
                .map(PathBuf::from)
                .unwrap_or(defaults.review_file),
            review_output: args
                .review_output
                .map(PathBuf::from)
                .unwrap_or(defaults.review_output),
            deadline: args
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_file: args.log_file.map(PathBuf::from).unwrap_or(defaults.log_file),
            base_url: args.base_url,
            use_color: !args.no_color,
        }
    }
}
