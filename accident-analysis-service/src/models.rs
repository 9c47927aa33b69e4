use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use crate::error::AnalysisError;

/// Lifecycle of a case in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    New,
    Analyzing,
    OpinionDraft,
    CardReady,
    Closed,
}

/// One accident report under review. Owned by the registry; the analysis
/// pipeline only reads case identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub applicant_name: String,
    pub applicant_pesel: String,
    pub accident_date: String,
    pub business_type: String,
    pub status: CaseStatus,
    pub submission_date: String,
    pub risk_score: u8,
}

/// An uploaded scan, held in memory for the duration of one run.
/// `content` is base64, optionally with a `data:<mime>;base64,` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub content: String,
}

impl UploadedDocument {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Document metadata recorded in the analysis state (never the content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Input of one pipeline run: either uploaded documents or, in the legacy
/// single-input mode, free-form text. The constructor is the only way in, so
/// an empty run cannot be represented.
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    Documents(Vec<UploadedDocument>),
    FallbackText(String),
}

impl AnalysisInput {
    pub fn from_parts(
        files: Vec<UploadedDocument>,
        text: Option<String>,
    ) -> Result<Self, AnalysisError> {
        if !files.is_empty() {
            return Ok(Self::Documents(files));
        }
        match text {
            Some(text) if !text.trim().is_empty() => Ok(Self::FallbackText(text)),
            _ => Err(AnalysisError::EmptyInput),
        }
    }

    pub fn document_metadata(&self) -> Vec<DocumentMeta> {
        match self {
            Self::Documents(documents) => documents.iter().map(UploadedDocument::meta).collect(),
            Self::FallbackText(_) => Vec::new(),
        }
    }

    pub fn processed_files_count(&self) -> usize {
        match self {
            Self::Documents(documents) => documents.len(),
            Self::FallbackText(_) => 0,
        }
    }
}

/// Verdict on one statutory accident criterion.
///
/// `Undetermined` means the source material could not be read well enough to
/// decide. It is distinct from `NotMet` everywhere, including on the wire,
/// where it serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CriterionVerdict {
    Met,
    NotMet,
    #[default]
    Undetermined,
}

impl From<Option<bool>> for CriterionVerdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Met,
            Some(false) => Self::NotMet,
            None => Self::Undetermined,
        }
    }
}

impl Serialize for CriterionVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Met => serializer.serialize_bool(true),
            Self::NotMet => serializer.serialize_bool(false),
            Self::Undetermined => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CriterionVerdict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<bool>::deserialize(deserializer)?.into())
    }
}

/// The four statutory accident criteria. Verdicts are independent: a
/// partially readable case may mix `Met`, `NotMet` and `Undetermined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriteriaVerdicts {
    #[serde(default)]
    pub suddenness: CriterionVerdict,
    #[serde(default, rename = "externalCause")]
    pub external_cause: CriterionVerdict,
    #[serde(default)]
    pub injury: CriterionVerdict,
    #[serde(default, rename = "workConnection")]
    pub work_connection: CriterionVerdict,
}

impl CriteriaVerdicts {
    fn all(&self) -> [CriterionVerdict; 4] {
        [
            self.suddenness,
            self.external_cause,
            self.injury,
            self.work_connection,
        ]
    }

    pub fn any_undetermined(&self) -> bool {
        self.all()
            .iter()
            .any(|verdict| *verdict == CriterionVerdict::Undetermined)
    }

    pub fn any_not_met(&self) -> bool {
        self.all()
            .iter()
            .any(|verdict| *verdict == CriterionVerdict::NotMet)
    }

    pub fn all_met(&self) -> bool {
        self.all()
            .iter()
            .all(|verdict| *verdict == CriterionVerdict::Met)
    }
}

/// Draft accident report card fields. Unreadable fields carry the
/// `DO UZUPEŁNIENIA` sentinel rather than guessed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccidentCardData {
    #[serde(default)]
    pub accident_date: String,
    #[serde(default)]
    pub accident_place: String,
    #[serde(default)]
    pub victim_name: String,
    #[serde(default)]
    pub victim_pesel: String,
    #[serde(default)]
    pub circumstances: String,
    #[serde(default)]
    pub causes: String,
    #[serde(default)]
    pub effects: String,
}

/// Output of the legal-analysis stage. Every field defaults so a near-valid
/// model response still parses instead of being thrown away.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegalAssessment {
    #[serde(default)]
    pub identified_documents: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub discrepancies: Vec<String>,
    #[serde(default)]
    pub missing_documents_suggestions: Vec<String>,
    #[serde(default)]
    pub medical_consultation_needed: bool,
    #[serde(default)]
    pub criteria: CriteriaVerdicts,
    #[serde(default)]
    pub criteria_explanation: HashMap<String, String>,
    #[serde(default)]
    pub accident_card_data: AccidentCardData,
    #[serde(default)]
    pub legal_opinion_draft: String,
}

/// Coarse recommendation attached to the confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    Reject,
    NeedsClarification,
}

/// Output of the confidence-scoring stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub confidence_score: u8,
    pub recommendation_short: Recommendation,
    #[serde(default)]
    pub reasoning_short: String,
}

/// Merged, immutable result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub assessment: LegalAssessment,
    pub calculation: Calculation,
    pub processed_files_count: usize,
}

/// Pipeline stage visible to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    Idle,
    Uploading,
    OcrProcessing,
    LegalAnalysis,
    CalculatingConfidence,
    Complete,
    Error,
}

/// Published per-case pipeline state.
///
/// Constructed only through the functions below, which keep the invariants:
/// `result` is set exactly in `complete`, `error` exactly in `error`, and
/// `progress` is reset to 0 on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisState {
    pub step: AnalysisStep,
    pub progress: u8,
    pub files: Vec<DocumentMeta>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl AnalysisState {
    /// State of a case that has never been analyzed (or was reset).
    pub fn idle() -> Self {
        Self {
            step: AnalysisStep::Idle,
            progress: 0,
            files: Vec::new(),
            result: None,
            error: None,
        }
    }

    pub fn in_progress(step: AnalysisStep, progress: u8, files: Vec<DocumentMeta>) -> Self {
        Self {
            step,
            progress,
            files,
            result: None,
            error: None,
        }
    }

    pub fn complete(files: Vec<DocumentMeta>, result: AnalysisResult) -> Self {
        Self {
            step: AnalysisStep::Complete,
            progress: 100,
            files,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(files: Vec<DocumentMeta>, message: String) -> Self {
        Self {
            step: AnalysisStep::Error,
            progress: 0,
            files,
            result: None,
            error: Some(message),
        }
    }
}

/// Conclusion of a medical consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationConclusion {
    InjuryConfirmed,
    DiseaseConfirmed,
    InsufficientData,
}

/// On-demand opinion of the certifying physician. Kept by the caller, never
/// merged into an [`AnalysisResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalOpinion {
    pub doctor_opinion: String,
    pub conclusion: ConsultationConclusion,
    pub icd10_suggestion: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Pre-filled new-case form fields. Empty string means "could not be
/// determined"; nothing is ever guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePrefill {
    #[serde(default)]
    pub applicant_name: String,
    #[serde(default)]
    pub applicant_pesel: String,
    #[serde(default)]
    pub accident_date: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    pub applicant_name: String,
    pub applicant_pesel: String,
    pub accident_date: String,
    #[serde(default)]
    pub business_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaseStatusRequest {
    pub status: CaseStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRiskScoreRequest {
    pub risk_score: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeCaseRequest {
    #[serde(default)]
    pub files: Vec<UploadedDocument>,
    #[serde(default)]
    pub text_input: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsultationRequest {
    pub question: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Deserialize)]
pub struct PrefillRequest {
    pub file: UploadedDocument,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn criterion_verdict_wire_shape() {
        let criteria = CriteriaVerdicts {
            suddenness: CriterionVerdict::Met,
            external_cause: CriterionVerdict::NotMet,
            injury: CriterionVerdict::Undetermined,
            work_connection: CriterionVerdict::Met,
        };

        let value = serde_json::to_value(&criteria).unwrap();
        assert_eq!(
            value,
            json!({
                "suddenness": true,
                "externalCause": false,
                "injury": null,
                "workConnection": true
            })
        );

        let back: CriteriaVerdicts = serde_json::from_value(value).unwrap();
        assert_eq!(back, criteria);
    }

    #[test]
    fn missing_criterion_field_is_undetermined_not_false() {
        let criteria: CriteriaVerdicts =
            serde_json::from_value(json!({ "suddenness": true })).unwrap();

        assert_eq!(criteria.suddenness, CriterionVerdict::Met);
        assert_eq!(criteria.external_cause, CriterionVerdict::Undetermined);
        assert_eq!(criteria.injury, CriterionVerdict::Undetermined);
        assert!(criteria.any_undetermined());
        assert!(!criteria.any_not_met());
    }

    #[test]
    fn criteria_helpers() {
        let all_met = CriteriaVerdicts {
            suddenness: CriterionVerdict::Met,
            external_cause: CriterionVerdict::Met,
            injury: CriterionVerdict::Met,
            work_connection: CriterionVerdict::Met,
        };
        assert!(all_met.all_met());
        assert!(!all_met.any_undetermined());
        assert!(!all_met.any_not_met());

        let mixed = CriteriaVerdicts {
            injury: CriterionVerdict::NotMet,
            ..all_met
        };
        assert!(!mixed.all_met());
        assert!(mixed.any_not_met());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            AnalysisInput::from_parts(Vec::new(), None),
            Err(AnalysisError::EmptyInput)
        ));
        assert!(matches!(
            AnalysisInput::from_parts(Vec::new(), Some("   ".to_string())),
            Err(AnalysisError::EmptyInput)
        ));
    }

    #[test]
    fn fallback_text_is_accepted_without_documents() {
        let input =
            AnalysisInput::from_parts(Vec::new(), Some("description of the event".to_string()))
                .unwrap();
        assert!(matches!(input, AnalysisInput::FallbackText(_)));
        assert_eq!(input.processed_files_count(), 0);
        assert!(input.document_metadata().is_empty());
    }

    #[test]
    fn documents_take_precedence_over_text() {
        let document = UploadedDocument {
            name: "scan.png".to_string(),
            mime_type: "image/png".to_string(),
            content: "data:image/png;base64,AAAA".to_string(),
        };
        let input = AnalysisInput::from_parts(vec![document], Some("ignored".to_string())).unwrap();

        assert!(matches!(input, AnalysisInput::Documents(_)));
        assert_eq!(input.processed_files_count(), 1);
        assert_eq!(input.document_metadata()[0].name, "scan.png");
    }

    #[test]
    fn state_constructors_uphold_invariants() {
        let idle = AnalysisState::idle();
        assert_eq!(idle.step, AnalysisStep::Idle);
        assert!(idle.result.is_none() && idle.error.is_none());

        let failed = AnalysisState::failed(Vec::new(), "boom".to_string());
        assert_eq!(failed.step, AnalysisStep::Error);
        assert_eq!(failed.progress, 0);
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn analysis_result_serializes_flat() {
        let result = AnalysisResult {
            assessment: LegalAssessment {
                summary: "fall from a ladder".to_string(),
                ..LegalAssessment::default()
            },
            calculation: Calculation {
                confidence_score: 95,
                recommendation_short: Recommendation::Accept,
                reasoning_short: "All criteria met.".to_string(),
            },
            processed_files_count: 2,
        };

        let value = serde_json::to_value(&result).unwrap();
        // assessment fields sit at the top level, next to the calculation
        assert_eq!(value["summary"], "fall from a ladder");
        assert_eq!(value["calculation"]["confidence_score"], 95);
        assert_eq!(value["calculation"]["recommendation_short"], "ACCEPT");
        assert_eq!(value["processed_files_count"], 2);
    }

    #[test]
    fn recommendation_wire_names() {
        assert_eq!(
            serde_json::to_value(Recommendation::NeedsClarification).unwrap(),
            json!("NEEDS_CLARIFICATION")
        );
        let parsed: Recommendation = serde_json::from_value(json!("REJECT")).unwrap();
        assert_eq!(parsed, Recommendation::Reject);
    }
}
