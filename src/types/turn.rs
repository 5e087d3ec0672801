use serde::{Deserialize, Serialize};

use crate::types::AttachmentRef;

/// Author of a turn in the conversation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing at the console.
    User,

    /// The generative model.
    Model,
}

/// One piece of message content.
///
/// A part is either literal text or a reference to a file previously uploaded
/// to the backend store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text(String),

    /// A file uploaded to the backend store.
    Attachment(AttachmentRef),
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    /// Returns the text of a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::Attachment(_) => None,
        }
    }

    /// Returns the reference of an attachment part.
    pub fn as_attachment(&self) -> Option<&AttachmentRef> {
        match self {
            Part::Text(_) => None,
            Part::Attachment(reference) => Some(reference),
        }
    }
}

impl From<AttachmentRef> for Part {
    fn from(reference: AttachmentRef) -> Self {
        Part::Attachment(reference)
    }
}

/// One immutable entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: Part,
}

impl Turn {
    /// Create a turn from a role and its content.
    pub fn new(role: Role, content: Part) -> Self {
        Self { role, content }
    }

    /// Create a user turn holding text.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Part::text(text))
    }

    /// Create a model turn holding text.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, Part::text(text))
    }

    /// The author of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The content of this turn.
    pub fn content(&self) -> &Part {
        &self.content
    }

    /// The text of this turn, if it holds text.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}
