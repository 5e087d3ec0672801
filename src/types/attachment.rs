use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Handle to a file that has been uploaded to the backend store.
///
/// Produced by an uploader and consumed once when the outgoing message of a
/// review cycle is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRef {
    uri: String,
    mime_type: String,
}

impl AttachmentRef {
    /// Create a reference from its URI and MIME type.
    pub fn new(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }

    /// The URI identifying the uploaded file.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The MIME type the file was uploaded with.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Metadata the file store returns for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,

    /// URI to use in `fileData` parts.
    pub uri: String,

    /// MIME type recorded by the store.
    pub mime_type: String,

    /// Size of the file; the API encodes int64 values as strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<String>,

    /// Processing state, e.g. `ACTIVE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// When the file was created.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::utils::time"
    )]
    pub create_time: Option<OffsetDateTime>,

    /// When the store will delete the file.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::utils::time"
    )]
    pub expiration_time: Option<OffsetDateTime>,
}

impl UploadedFile {
    /// Convert into the reference used in outgoing messages.
    pub fn to_attachment_ref(&self) -> AttachmentRef {
        AttachmentRef::new(self.uri.clone(), self.mime_type.clone())
    }
}

/// Envelope the upload endpoint wraps the file metadata in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// The uploaded file.
    pub file: UploadedFile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn uploaded_file_deserialization() {
        let json = r#"{
            "file": {
                "name": "files/abc123",
                "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
                "mimeType": "text/plain",
                "sizeBytes": "2048",
                "createTime": "2025-03-01T10:00:00.123456Z",
                "expirationTime": "2025-03-03T10:00:00.123456Z",
                "state": "ACTIVE"
            }
        }"#;
        let response: UploadResponse = serde_json::from_str(json).unwrap();
        let file = response.file;
        assert_eq!(file.name, "files/abc123");
        assert_eq!(file.size_bytes.as_deref(), Some("2048"));
        assert_eq!(file.state.as_deref(), Some("ACTIVE"));
        assert_eq!(
            file.expiration_time.map(|t| t.date()),
            Some(datetime!(2025-03-03 10:00:00 UTC).date())
        );

        let reference = file.to_attachment_ref();
        assert_eq!(
            reference.uri(),
            "https://generativelanguage.googleapis.com/v1beta/files/abc123"
        );
        assert_eq!(reference.mime_type(), "text/plain");
    }

    #[test]
    fn uploaded_file_minimal() {
        let json = r#"{"name": "files/x", "uri": "files/x", "mimeType": "text/markdown"}"#;
        let file: UploadedFile = serde_json::from_str(json).unwrap();
        assert!(file.create_time.is_none());
        assert!(file.expiration_time.is_none());
    }
}
