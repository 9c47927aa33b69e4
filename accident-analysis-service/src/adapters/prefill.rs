use anyhow::anyhow;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use super::extraction::TextExtractor;
use super::llm::{call_json_completion, extract_json_object};
use crate::models::{CasePrefill, UploadedDocument};

const PREFILL_MODEL: &str = "openai/gpt-4o";
const MAX_PREFILL_TOKENS: u32 = 300;

const PREFILL_PROMPT: &str = r#"You are a case-registration assistant. Pre-fill the new-case form from the attached document.

Extract the following fields (return an empty string when a field cannot be determined):
1. Applicant full name (applicantName)
2. National identification number (applicantPesel) - remove any spaces.
3. Accident date (accidentDate) - format YYYY-MM-DD. If the year is missing, assume the current one.
4. Short event description (description) - one sentence stating WHAT happened (e.g. "Fall from stairs", "Heart attack").

Return JSON:
{
    "applicantName": string,
    "applicantPesel": string,
    "accidentDate": string,
    "description": string
}"#;

const OCR_FAILED_NOTE: &str = "[NOTE: OCR failed. Infer the data from the file name only, or return empty fields for the user to fill in manually.]";

/// One-shot form pre-fill from a single uploaded document. Shares the
/// extraction adapter with the pipeline but runs outside of it: no progress
/// tracking, failures surface directly to the caller.
pub struct MetadataPrefillClient {
    api_key: String,
    extractor: Arc<dyn TextExtractor>,
}

impl MetadataPrefillClient {
    pub fn new(api_key: String, extractor: Arc<dyn TextExtractor>) -> Self {
        Self { api_key, extractor }
    }

    pub async fn prefill(&self, document: &UploadedDocument) -> anyhow::Result<CasePrefill> {
        info!(file = %document.name, "Pre-filling case form from document");

        let mut content: Vec<Value> = vec![json!({
            "type": "text",
            "text": format!("Document: {}", document.name)
        })];

        if document.is_image() {
            // images go straight to vision, no OCR round trip
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": document.content }
            }));
        } else {
            match self.extractor.extract(document).await {
                Ok(text) => content.push(json!({
                    "type": "text",
                    "text": format!("DOCUMENT TEXT (OCR):\n{}", text)
                })),
                Err(e) => {
                    warn!(file = %document.name, error = %e, "OCR failed during form pre-fill");
                    content.push(json!({ "type": "text", "text": OCR_FAILED_NOTE }));
                }
            }
        }

        let raw = call_json_completion(
            &self.api_key,
            PREFILL_MODEL,
            PREFILL_PROMPT,
            content,
            MAX_PREFILL_TOKENS,
        )
        .await?;

        serde_json::from_str(extract_json_object(&raw))
            .map_err(|e| anyhow!("unparseable pre-fill response: {}", e))
    }
}
