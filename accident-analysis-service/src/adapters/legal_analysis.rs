use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::llm::{call_json_completion, extract_json_object};
use crate::error::AnalysisError;
use crate::models::{AnalysisInput, LegalAssessment};

const ANALYST_MODEL: &str = "openai/gpt-4o";
const MAX_ANALYSIS_TOKENS: u32 = 2500;

/// Wire-level sentinel for a field that could not be read from the scans.
/// Downstream artifacts (accident card, opinion draft) are Polish-language
/// documents, so the sentinel stays in the domain language.
pub const FIELD_SENTINEL: &str = "DO UZUPEŁNIENIA";

/// Summary of the fallback assessment used when the model response is not
/// valid JSON.
pub const FALLBACK_SUMMARY: &str =
    "AI response could not be processed. Manual review of the source documents is required.";

pub const FALLBACK_OPINION: &str = "Opinion draft could not be generated.";

const ANALYST_PROMPT: &str = r#"You are an assistant to a senior social-insurance accident inspector.
Your goal: preliminary verification of workplace-accident documentation and a draft of the accident report card.

YOU DO NOT ISSUE DECISIONS. You analyze facts and suggest conclusions that a human must approve.

READING TASKS:
1. Analyze the attached document images AND the OCR text.
2. Vision (image) takes precedence for handwriting and stamps.
3. OCR (text) helps with long machine-printed passages.

ANALYSIS TASKS:
1. Read all data (dates, places, names, course of events).
2. Detect DISCREPANCIES (e.g. a different accident date in the report and in the medical certificate).
3. Verify the statutory accident criteria (suddenness, external cause, injury, work connection).
4. When in doubt -> list MISSING DOCUMENTS (e.g. "Missing statement of witness X").
5. If the injury is unclear -> recommend a consultation with the certifying physician.
6. Prepare the ACCIDENT REPORT CARD data.
7. Draft the LEGAL OPINION (support for the human decision).

DATA RULES (CRITICAL):
- If a piece of information cannot be read (illegible handwriting, blurred photo, missing page), put exactly "DO UZUPEŁNIENIA" in that field.
- Never guess personal data or dates.
- If most of the input is unreadable, set 'summary' to: "WARNING: Analysis limited due to low scan quality. Manual verification required."
- Add "Improve scan quality (document unreadable)" to 'missing_documents_suggestions' when applicable.

IMPORTANT: If a criterion cannot be evaluated, return null for it in 'criteria'. Never return false to mean "cannot tell".

Return JSON:
{
  "identified_documents": ["list of recognized documents"],
  "summary": "Concise statement of the established facts",
  "discrepancies": ["Discrepancy 1", "Discrepancy 2, or none"],
  "missing_documents_suggestions": ["Document 1", "Document 2"],
  "medical_consultation_needed": boolean,
  "criteria": {
    "suddenness": boolean | null,
    "externalCause": boolean | null,
    "injury": boolean | null,
    "workConnection": boolean | null
  },
  "criteria_explanation": {
    "suddenness": "Justification...",
    "externalCause": "Justification...",
    "injury": "Justification...",
    "workConnection": "Justification..."
  },
  "accident_card_data": {
    "accident_date": "YYYY-MM-DD",
    "accident_place": "Place of the event",
    "victim_name": "Full name",
    "victim_pesel": "National ID",
    "circumstances": "Detailed description of the circumstances",
    "causes": "Causes of the accident (e.g. slipping, faulty machine)",
    "effects": "Effects (injury type, body part)"
  },
  "legal_opinion_draft": "Draft opinion text. Format: \n1. Findings of fact... \n2. Criteria verification... \n3. Recommendation (recognize / do not recognize)... \n4. Justification..."
}"#;

/// Runs the multimodal legal analysis of one case's documents.
#[async_trait]
pub trait LegalAnalyst: Send + Sync {
    /// `extracted` holds the OCR text per document, aligned with the upload
    /// order; it is empty in fallback-text mode.
    async fn analyze(
        &self,
        input: &AnalysisInput,
        extracted: &[String],
    ) -> Result<LegalAssessment, AnalysisError>;
}

pub struct LegalAnalysisClient {
    api_key: String,
}

impl LegalAnalysisClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl LegalAnalyst for LegalAnalysisClient {
    async fn analyze(
        &self,
        input: &AnalysisInput,
        extracted: &[String],
    ) -> Result<LegalAssessment, AnalysisError> {
        let content = build_user_content(input, extracted);
        info!(parts = content.len(), "Requesting legal analysis");

        let raw = call_json_completion(
            &self.api_key,
            ANALYST_MODEL,
            ANALYST_PROMPT,
            content,
            MAX_ANALYSIS_TOKENS,
        )
        .await
        .map_err(|e| AnalysisError::Analysis(e.to_string()))?;

        Ok(parse_assessment(&raw))
    }
}

/// Assemble the multimodal user message. Each document contributes an
/// explicit delimiter (so the model can attribute findings to a source), its
/// image content when it is an image, and its OCR text.
fn build_user_content(input: &AnalysisInput, extracted: &[String]) -> Vec<Value> {
    match input {
        AnalysisInput::Documents(documents) => {
            let mut content = Vec::new();
            for (index, document) in documents.iter().enumerate() {
                content.push(json!({
                    "type": "text",
                    "text": format!("\n--- DOCUMENT {} ({}) ---\n", index + 1, document.name)
                }));

                if document.is_image() {
                    content.push(json!({
                        "type": "image_url",
                        "image_url": { "url": document.content }
                    }));
                }

                let text = extracted.get(index).map(String::as_str).unwrap_or_default();
                content.push(json!({
                    "type": "text",
                    "text": format!("OCR TEXT:\n{}\n", text)
                }));

                content.push(json!({
                    "type": "text",
                    "text": "\n-----------------------------------\n"
                }));
            }
            content
        }
        AnalysisInput::FallbackText(text) => {
            vec![json!({ "type": "text", "text": text })]
        }
    }
}

/// Parse the model response; a response that is not the expected JSON yields
/// the fixed fallback assessment so the run can proceed to scoring.
fn parse_assessment(raw: &str) -> LegalAssessment {
    match serde_json::from_str::<LegalAssessment>(extract_json_object(raw)) {
        Ok(assessment) => assessment,
        Err(e) => {
            warn!(error = %e, "Legal analysis response was not valid JSON, using fallback");
            fallback_assessment()
        }
    }
}

fn fallback_assessment() -> LegalAssessment {
    LegalAssessment {
        summary: FALLBACK_SUMMARY.to_string(),
        legal_opinion_draft: FALLBACK_OPINION.to_string(),
        ..LegalAssessment::default()
    }
}
