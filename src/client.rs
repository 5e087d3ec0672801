use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};

use crate::backend::{Backend, ChunkStream, GenerationRequest, Uploader};
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, UPLOAD_FAILURES, UPLOADS,
};
use crate::sse::{process_sse, text_chunks};
use crate::types::{
    ApiErrorResponse, AttachmentRef, GenerateContentRequest, Model, UploadResponse, UploadedFile,
};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Gemini generative-language API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: String,
    model: Model,
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client for the default model.
    ///
    /// The API key can be provided directly or read from the GEMINI_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds connecting and each upload request.  It does not bound
    /// a streamed generation; cycles carry their own deadline.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<Model>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::configuration(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::configuration("API key is empty"));
        }
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(Error::configuration(
                "API key contains characters not allowed in a header",
            ));
        }

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        url::Url::parse(&base_url)
            .map_err(|e| Error::configuration(format!("invalid base URL {base_url:?}: {e}")))?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            client,
            base_url,
            model: model.unwrap_or_default(),
            timeout,
        })
    }

    /// The model generations are requested from.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| Error::configuration(format!("invalid API key: {e}")))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    fn stream_url(&self) -> String {
        format!(
            "{}v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn upload_url(&self) -> String {
        format!("{}upload/v1beta/files", self.base_url)
    }

    fn send_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = serde_json::from_str::<ApiErrorResponse>(&error_body).ok();
        let status = parsed.as_ref().and_then(|e| e.error.status.clone());
        let error_message = parsed
            .and_then(|e| e.error.message)
            .unwrap_or(error_body);

        match status_code {
            400 => Error::bad_request(error_message),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message, None),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, status, error_message),
        }
    }

    /// Open a streamed generation and return its text chunks.
    pub async fn stream(&self, request: &GenerateContentRequest) -> Result<ChunkStream> {
        let url = self.stream_url();
        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(
            model = %self.model,
            contents = request.contents.len(),
            "opening generation"
        );
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let bytes = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(text_chunks(process_sse(bytes))))
    }

    /// Upload a local file with the resumable upload protocol.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        let content = tokio::fs::read(path).await.map_err(|e| {
            Error::attachment(
                format!("cannot read attachment: {e}"),
                Some(path),
                Some(Box::new(e)),
            )
        })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_text_plain()
            .essence_str()
            .to_string();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        CLIENT_REQUESTS.click();
        tracing::debug!(
            path = %path.display(),
            %mime_type,
            bytes = content.len(),
            "starting upload"
        );
        let response = self
            .client
            .post(self.upload_url())
            .headers(self.default_headers()?)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", content.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type.as_str())
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        let session_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|val| val.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                Error::attachment("upload response carried no upload URL", Some(path), None)
            })?;

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(session_url)
            .header(header::CONTENT_LENGTH, content.len())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(content)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let uploaded = response.json::<UploadResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse upload response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(uploaded.file)
    }
}

#[async_trait::async_trait]
impl Backend for Gemini {
    async fn open_generation(&self, request: GenerationRequest) -> Result<ChunkStream> {
        let body = GenerateContentRequest::build(
            &request.system_instruction,
            &request.history,
            &request.new_parts,
        );
        self.stream(&body).await
    }
}

#[async_trait::async_trait]
impl Uploader for Gemini {
    async fn upload(&self, path: &Path) -> Result<AttachmentRef> {
        UPLOADS.click();
        match self.upload_file(path).await {
            Ok(file) => {
                tracing::info!(path = %path.display(), name = %file.name, "uploaded attachment");
                Ok(file.to_attachment_ref())
            }
            Err(err) => {
                UPLOAD_FAILURES.click();
                tracing::warn!(path = %path.display(), error = %err, "upload failed");
                if err.is_attachment() {
                    Err(err)
                } else {
                    Err(Error::attachment(
                        format!("upload failed: {err}"),
                        Some(path),
                        Some(Box::new(err)),
                    ))
                }
            }
        }
    }
}
