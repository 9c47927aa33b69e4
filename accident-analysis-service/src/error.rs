use thiserror::Error;

/// Failures of the analysis pipeline and its collaborators.
///
/// Only failures that abort a run live here. Recoverable degradations
/// (OCR timeouts, rejected files, malformed analysis JSON) are absorbed by
/// the adapters and surface as placeholder data instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Missing credential or setting. Fatal at startup, never retried.
    #[error("Missing configuration: {0}")]
    Configuration(String),

    /// Neither documents nor fallback text were supplied.
    #[error("No documents or fallback text supplied")]
    EmptyInput,

    /// Transport-level extraction failure for one document.
    #[error("Extraction failed for {name}: {message}")]
    Extraction { name: String, message: String },

    /// Legal-analysis call could not be made or returned no content.
    #[error("Legal analysis failed: {0}")]
    Analysis(String),

    /// Scoring call failed or returned an unparseable calculation. There is
    /// no safe default for a missing score.
    #[error("Confidence scoring failed: {0}")]
    Scoring(String),
}
