//! Wire types for the `streamGenerateContent` endpoint.

use serde::{Deserialize, Serialize};

use crate::types::{Part, Role, Turn};

/// File reference inside a wire part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// MIME type of the uploaded file.
    pub mime_type: String,
    /// URI returned by the file store.
    pub file_uri: String,
}

/// A part as the API encodes it: exactly one of the fields is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Uploaded file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                file_data: None,
            },
            Part::Attachment(reference) => WirePart {
                text: None,
                file_data: Some(FileData {
                    mime_type: reference.mime_type().to_string(),
                    file_uri: reference.uri().to_string(),
                }),
            },
        }
    }
}

/// One message: a role and its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// `user` or `model`; absent for the system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// The parts of the message.
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

/// Body of a generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation so far plus the new user message.
    pub contents: Vec<Content>,
    /// System instruction, omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl GenerateContentRequest {
    /// Build a request from history and the new user parts.
    ///
    /// Adjacent entries with the same role are merged into one content entry,
    /// so an attachment and its command text travel as a single user message.
    pub fn build(system_instruction: &str, history: &[Turn], new_parts: &[Part]) -> Self {
        let mut contents: Vec<Content> = Vec::new();
        let entries = history
            .iter()
            .map(|turn| (turn.role(), turn.content()))
            .chain(new_parts.iter().map(|part| (Role::User, part)));
        for (role, part) in entries {
            match contents.last_mut() {
                Some(last) if last.role == Some(role) => last.parts.push(part.into()),
                _ => contents.push(Content {
                    role: Some(role),
                    parts: vec![part.into()],
                }),
            }
        }
        let system_instruction = if system_instruction.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![WirePart {
                    text: Some(system_instruction.to_string()),
                    file_data: None,
                }],
            })
        };
        Self {
            contents,
            system_instruction,
        }
    }
}

/// One candidate answer inside a streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Content generated so far for this candidate.
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped, on the last chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Feedback about the prompt, present when the prompt was blocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Token accounting reported with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_token_count: Option<u32>,
    /// Tokens in the generated candidates.
    #[serde(default)]
    pub candidates_token_count: Option<u32>,
    /// Total tokens.
    #[serde(default)]
    pub total_token_count: Option<u32>,
}

/// One chunk of a streamed generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidates; the client only reads the first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Present when the prompt was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Token counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    /// The model version that answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, or `None` when the chunk
    /// carries no text at all.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let mut texts = content.parts.iter().filter_map(|p| p.text.as_deref()).peekable();
        texts.peek()?;
        Some(texts.collect())
    }

    /// The block reason, if the prompt was rejected.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

/// Error body returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// HTTP status code.
    #[serde(default)]
    pub code: Option<u16>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Canonical status, e.g. `INVALID_ARGUMENT`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Envelope wrapping [`ApiErrorBody`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// The error.
    pub error: ApiErrorBody,
}
