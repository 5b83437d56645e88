//! Gemini API client.
//!
//! Two calls are needed from the service: uploading a file through the
//! resumable Files API, and a single `generateContent` request mixing text
//! parts with references to uploaded files. Both sit behind the
//! [`GenerativeService`] trait so the upload pipeline can be driven by any
//! implementation, including test doubles.

use async_trait::async_trait;
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::config::GeminiConfig;

/// Header carrying the API key. The key never goes into a URL, so it cannot
/// show up in error messages that quote the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Handle returned by the service for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// One piece of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    File(UploadedFile),
}

/// A complete generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub parts: Vec<ContentPart>,
}

/// Safety annotation attached to a candidate or to the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

/// Per-candidate details reported alongside a failed generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateDiagnostics {
    pub finish_reason: Option<String>,
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("no Gemini API key configured (set {} or gemini.api_key)", crate::config::API_KEY_ENV)]
    MissingApiKey,

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(reqwest::Error),

    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Gemini returned no text{}", .block_reason.as_ref().map(|r| format!(" (prompt blocked: {})", r)).unwrap_or_default())]
    Blocked {
        block_reason: Option<String>,
        candidates: Vec<CandidateDiagnostics>,
    },

    #[error("unexpected response from Gemini: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GeminiError {
    fn from(e: reqwest::Error) -> Self {
        GeminiError::Http(e.without_url())
    }
}

impl GeminiError {
    /// Whether the service itself reported the failure, as opposed to the
    /// request never completing.
    pub fn is_service_error(&self) -> bool {
        matches!(self, GeminiError::Api { .. } | GeminiError::Blocked { .. })
    }

    /// Candidate diagnostics carried by the error, if any.
    pub fn candidates(&self) -> &[CandidateDiagnostics] {
        match self {
            GeminiError::Blocked { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

/// The two operations the pipeline needs from a generative service.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Uploads the file at `path`, declaring `mime_type`.
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile, GeminiError>;

    /// Runs one generation request and returns the response text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, GeminiError>;
}

/// [`GenerativeService`] backed by the Gemini REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, api_key: &str) -> Result<Self, GeminiError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn upload_start_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Opens `path` as a streamed request body, returning it with its length.
async fn file_body(path: &Path) -> Result<(Body, u64), GeminiError> {
    let io_error = |source| GeminiError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let len = file.metadata().await.map_err(io_error)?.len();
    Ok((Body::wrap_stream(ReaderStream::new(file)), len))
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<UploadedFile, GeminiError> {
        let (body, len) = file_body(path).await?;
        let display_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();

        // Step 1: open a resumable session.
        let start = self
            .client
            .post(self.upload_start_url())
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadStartFile { display_name },
            })
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                GeminiError::MalformedResponse("upload session has no x-goog-upload-url".to_string())
            })?
            .to_string();

        // Step 2: send the bytes and finalize.
        let finish = self
            .client
            .post(upload_url)
            .header(reqwest::header::CONTENT_LENGTH, len)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(body)
            .send()
            .await?;
        let finish = check_status(finish).await?;

        let body: UploadResponse = finish.json().await?;
        Ok(UploadedFile {
            name: body.file.name,
            uri: body.file.uri,
            mime_type: body.file.mime_type.unwrap_or_else(|| mime_type.to_string()),
        })
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, GeminiError> {
        let body = GenerateContentBody::from(&request);

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }
}

/// Turns non-2xx responses into [`GeminiError::Api`], keeping the service's message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GeminiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| match e.error.status {
            Some(s) => format!("{} ({})", e.error.message, s),
            None => e.error.message,
        })
        .unwrap_or_else(|_| text.trim().to_string());

    Err(GeminiError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pulls the response text out of the first candidate.
fn extract_text(body: GenerateContentResponse) -> Result<String, GeminiError> {
    let text = body
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();

    if !text.is_empty() {
        return Ok(text);
    }

    let candidates = body
        .candidates
        .iter()
        .map(|c| CandidateDiagnostics {
            finish_reason: c.finish_reason.clone(),
            safety_ratings: c.safety_ratings.clone(),
        })
        .collect();

    Err(GeminiError::Blocked {
        block_reason: body.prompt_feedback.and_then(|f| f.block_reason),
        candidates,
    })
}

#[derive(Serialize)]
struct UploadStartRequest {
    file: UploadStartFile,
}

#[derive(Serialize)]
struct UploadStartFile {
    display_name: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFileResource,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFileResource {
    name: String,
    uri: String,
    mime_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
}

#[derive(Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    File {
        #[serde(rename = "fileData")]
        file_data: WireFileData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData {
    mime_type: String,
    file_uri: String,
}

impl From<&GenerateRequest> for GenerateContentBody {
    fn from(request: &GenerateRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => WirePart::Text { text: text.clone() },
                ContentPart::File(file) => WirePart::File {
                    file_data: WireFileData {
                        mime_type: file.mime_type.clone(),
                        file_uri: file.uri.clone(),
                    },
                },
            })
            .collect();

        Self {
            system_instruction: WireContent {
                role: None,
                parts: vec![WirePart::Text {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![WireContent {
                role: Some("user"),
                parts,
            }],
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uploaded(uri: &str, mime: &str) -> UploadedFile {
        UploadedFile {
            name: "files/x".to_string(),
            uri: uri.to_string(),
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            system_instruction: "be brief".to_string(),
            parts: vec![
                ContentPart::Text("User's Prompt:hi".to_string()),
                ContentPart::File(uploaded("https://files/1", "image/png")),
            ],
        };

        let value = serde_json::to_value(GenerateContentBody::from(&request)).unwrap();

        assert_eq!(
            value,
            json!({
                "systemInstruction": { "parts": [{ "text": "be brief" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "User's Prompt:hi" },
                        { "fileData": { "mimeType": "image/png", "fileUri": "https://files/1" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "archive." }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(body).unwrap(), "Hello, archive.");
    }

    #[test]
    fn test_extract_text_reports_safety_block() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "finishReason": "SAFETY",
                "safetyRatings": [
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH" }
                ]
            }]
        }))
        .unwrap();

        let err = extract_text(body).unwrap_err();

        assert!(err.is_service_error());
        let candidates = err.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].finish_reason.as_deref(), Some("SAFETY"));
        assert_eq!(candidates[0].safety_ratings[0].probability, "HIGH");
    }

    #[test]
    fn test_extract_text_reports_prompt_block() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "OTHER" }
        }))
        .unwrap();

        let err = extract_text(body).unwrap_err();

        assert!(matches!(
            &err,
            GeminiError::Blocked { block_reason: Some(r), .. } if r == "OTHER"
        ));
        assert_eq!(err.to_string(), "Gemini returned no text (prompt blocked: OTHER)");
    }

    #[test]
    fn test_upload_response_parsing() {
        let body: UploadResponse = serde_json::from_value(json!({
            "file": {
                "name": "files/abc",
                "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc",
                "mimeType": "application/pdf",
                "state": "ACTIVE"
            }
        }))
        .unwrap();

        assert_eq!(body.file.name, "files/abc");
        assert_eq!(body.file.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_client_requires_key() {
        let err = GeminiClient::new(&GeminiConfig::default(), "  ").unwrap_err();
        assert!(matches!(err, GeminiError::MissingApiKey));
    }

    #[test]
    fn test_client_urls() {
        let config = GeminiConfig {
            base_url: "https://example.test/".to_string(),
            model: "gemini-test".to_string(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config, "k").unwrap();

        assert_eq!(
            client.generate_url(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
        assert_eq!(
            client.upload_start_url(),
            "https://example.test/upload/v1beta/files"
        );
        assert!(!format!("{:?}", client).contains("key"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_contain_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"alpha").unwrap();

        // Nothing listens on the discard port, so the connection is refused.
        let config = GeminiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config, "SECRET-KEY-123").unwrap();

        let upload_err = client.upload_file(&path, "text/plain").await.unwrap_err();
        assert!(matches!(upload_err, GeminiError::Http(_)));
        assert!(!upload_err.to_string().contains("SECRET-KEY-123"));

        let request = GenerateRequest {
            system_instruction: "sys".to_string(),
            parts: vec![ContentPart::Text("hi".to_string())],
        };
        let generate_err = client.generate(request).await.unwrap_err();
        assert!(!generate_err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{:?}", generate_err).contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_file_body_reports_length() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![7u8; 4096]).unwrap();

        let (_, len) = file_body(&path).await.unwrap();

        assert_eq!(len, 4096);
    }

    #[tokio::test]
    async fn test_file_body_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("gone.wav");

        let err = file_body(&missing).await.err().unwrap();

        assert!(matches!(&err, GeminiError::Io { path, .. } if path.ends_with("gone.wav")));
    }

    #[test]
    fn test_service_error_classification() {
        let api = GeminiError::Api {
            status: 429,
            message: "quota".to_string(),
        };
        let malformed = GeminiError::MalformedResponse("x".to_string());

        assert!(api.is_service_error());
        assert!(!malformed.is_service_error());
        assert!(api.candidates().is_empty());
        assert_eq!(api.to_string(), "Gemini API returned 429: quota");
    }
}
