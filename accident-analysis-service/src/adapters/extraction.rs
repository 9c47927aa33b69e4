use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::models::UploadedDocument;

/// Upper bound on one OCR round trip.
pub const OCR_TIMEOUT: Duration = Duration::from_secs(12);

/// Working language of the scanned documents.
pub const OCR_LANGUAGE: &str = "pol";

/// Fixed placeholder returned when OCR exceeds its deadline. A slow document
/// degrades to this text instead of aborting the run.
pub const OCR_TIMEOUT_PLACEHOLDER: &str =
    "[OCR timeout: document too complex or unreadable. Manual verification required.]";

pub const DEFAULT_EXTRACTION_URL: &str = "https://api.unstructuredapp.io/general/v0/general";

/// Fixed placeholder returned when the extraction service rejects a file.
pub fn read_failure_placeholder(name: &str) -> String {
    format!("[Failed to read file {}]", name)
}

/// Extracts the text of one uploaded document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &UploadedDocument) -> Result<String, AnalysisError>;
}

/// One text segment in the extraction service response; segments are joined
/// with newlines in order.
#[derive(Debug, Deserialize)]
struct ExtractedSegment {
    #[serde(default)]
    text: String,
}

enum OcrReply {
    Segments(Vec<ExtractedSegment>),
    Rejected { status: StatusCode, body: String },
}

/// OCR adapter for the Unstructured partition API.
pub struct UnstructuredOcrClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl UnstructuredOcrClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_EXTRACTION_URL.to_string())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            endpoint,
        }
    }

    async fn request_ocr(&self, name: &str, bytes: Vec<u8>) -> Result<OcrReply, reqwest::Error> {
        let form = multipart::Form::new()
            .part(
                "files",
                multipart::Part::bytes(bytes).file_name(name.to_string()),
            )
            .text("strategy", "hi_res")
            .text("languages", OCR_LANGUAGE);

        let response = self
            .http
            .post(&self.endpoint)
            .header("unstructured-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Ok(OcrReply::Rejected { status, body });
        }

        let segments = response.json().await?;
        Ok(OcrReply::Segments(segments))
    }
}

#[async_trait]
impl TextExtractor for UnstructuredOcrClient {
    /// Timeouts and rejected files come back as placeholder text; only
    /// transport failures surface as errors, and the caller decides whether
    /// the run survives them.
    async fn extract(&self, document: &UploadedDocument) -> Result<String, AnalysisError> {
        let raw = strip_data_uri_header(&document.content);
        let bytes = STANDARD
            .decode(raw.trim())
            .map_err(|e| AnalysisError::Extraction {
                name: document.name.clone(),
                message: format!("invalid base64 payload: {}", e),
            })?;

        info!(
            file = %document.name,
            bytes = bytes.len(),
            "Submitting document for OCR"
        );

        let reply = match timeout(OCR_TIMEOUT, self.request_ocr(&document.name, bytes)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                return Err(AnalysisError::Extraction {
                    name: document.name.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!(file = %document.name, "OCR timed out");
                return Ok(OCR_TIMEOUT_PLACEHOLDER.to_string());
            }
        };

        match reply {
            OcrReply::Segments(segments) => {
                let text = segments
                    .iter()
                    .map(|segment| segment.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                info!(file = %document.name, chars = text.len(), "OCR completed");
                Ok(text)
            }
            OcrReply::Rejected { status, body } => {
                warn!(
                    file = %document.name,
                    %status,
                    error = %body,
                    "Extraction service rejected document"
                );
                Ok(read_failure_placeholder(&document.name))
            }
        }
    }
}

/// Strip an optional `data:<mime>;base64,` header from an uploaded payload.
fn strip_data_uri_header(content: &str) -> &str {
    if content.starts_with("data:") {
        if let Some(index) = content.find("base64,") {
            return &content[index + "base64,".len()..];
        }
    }
    content
}
