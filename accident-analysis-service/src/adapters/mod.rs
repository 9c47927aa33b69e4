pub mod consultation;
pub mod extraction;
pub mod legal_analysis;
pub mod llm;
pub mod prefill;
pub mod scoring;

pub use consultation::MedicalConsultationClient;
pub use extraction::{OCR_TIMEOUT_PLACEHOLDER, TextExtractor, UnstructuredOcrClient};
pub use legal_analysis::{FIELD_SENTINEL, LegalAnalysisClient, LegalAnalyst};
pub use prefill::MetadataPrefillClient;
pub use scoring::{ConfidenceScorer, ScoringClient};
