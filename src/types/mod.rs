// Public modules
pub mod attachment;
pub mod generate_content;
pub mod model;
pub mod turn;

// Re-exports
pub use attachment::{AttachmentRef, UploadResponse, UploadedFile};
pub use generate_content::{
    ApiErrorBody, ApiErrorResponse, Candidate, Content, FileData, GenerateContentRequest,
    GenerateContentResponse, PromptFeedback, UsageMetadata, WirePart,
};
pub use model::{KnownModel, Model};
pub use turn::{Part, Role, Turn};
