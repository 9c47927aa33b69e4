use std::sync::Arc;

use case_flow::{RunRegistry, RunToken, StateStore};
use tracing::{debug, error, info};

use crate::adapters::{ConfidenceScorer, LegalAnalyst, TextExtractor};
use crate::error::AnalysisError;
use crate::models::{AnalysisInput, AnalysisResult, AnalysisState, AnalysisStep, DocumentMeta};

/// Drives one case's analysis pipeline and owns every write to the state
/// store.
///
/// Stages run strictly in sequence; progress is published at real stage
/// boundaries, never on timers. A second `start` for the same case
/// supersedes the first run: the older run keeps executing but all of its
/// state updates are discarded by its stale run token.
pub struct AnalysisOrchestrator {
    store: Arc<dyn StateStore<AnalysisState>>,
    runs: RunRegistry,
    extractor: Arc<dyn TextExtractor>,
    analyst: Arc<dyn LegalAnalyst>,
    scorer: Arc<dyn ConfidenceScorer>,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: Arc<dyn StateStore<AnalysisState>>,
        extractor: Arc<dyn TextExtractor>,
        analyst: Arc<dyn LegalAnalyst>,
        scorer: Arc<dyn ConfidenceScorer>,
    ) -> Self {
        Self {
            store,
            runs: RunRegistry::new(),
            extractor,
            analyst,
            scorer,
        }
    }

    /// Current state of a case, `idle` when it has never been analyzed.
    pub async fn state(&self, case_id: &str) -> AnalysisState {
        match self.store.get(case_id).await {
            Ok(Some(state)) => state,
            Ok(None) => AnalysisState::idle(),
            Err(e) => {
                error!(case_id, error = %e, "Failed to read analysis state");
                AnalysisState::idle()
            }
        }
    }

    /// Discard a case's analysis state and supersede any run in flight.
    pub async fn reset(&self, case_id: &str) {
        self.runs.invalidate(case_id);
        if let Err(e) = self.store.delete(case_id).await {
            error!(case_id, error = %e, "Failed to reset analysis state");
        }
        info!(case_id, "Analysis state reset");
    }

    /// Run the full pipeline for one case. No stage is retried here; a
    /// retry is a fresh caller-initiated `start`.
    pub async fn start(
        &self,
        case_id: &str,
        input: AnalysisInput,
    ) -> Result<AnalysisResult, AnalysisError> {
        let token = self.runs.begin(case_id);
        let files = input.document_metadata();

        info!(case_id, files = files.len(), "Starting case analysis");
        self.publish(
            &token,
            AnalysisState::in_progress(AnalysisStep::Uploading, 10, files.clone()),
        )
        .await;

        match self.run_pipeline(&token, &input, &files).await {
            Ok(result) => {
                self.publish(&token, AnalysisState::complete(files, result.clone()))
                    .await;
                info!(
                    case_id,
                    score = result.calculation.confidence_score,
                    "Case analysis complete"
                );
                Ok(result)
            }
            Err(e) => {
                error!(case_id, error = %e, "Case analysis failed");
                self.publish(&token, AnalysisState::failed(files, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        token: &RunToken,
        input: &AnalysisInput,
        files: &[DocumentMeta],
    ) -> Result<AnalysisResult, AnalysisError> {
        self.publish(
            token,
            AnalysisState::in_progress(AnalysisStep::OcrProcessing, 30, files.to_vec()),
        )
        .await;
        let extracted = self.extract_documents(input).await?;

        self.publish(
            token,
            AnalysisState::in_progress(AnalysisStep::LegalAnalysis, 50, files.to_vec()),
        )
        .await;
        let assessment = self.analyst.analyze(input, &extracted).await?;

        self.publish(
            token,
            AnalysisState::in_progress(AnalysisStep::CalculatingConfidence, 85, files.to_vec()),
        )
        .await;
        let calculation = self.scorer.score(&assessment).await?;

        Ok(AnalysisResult {
            assessment,
            calculation,
            processed_files_count: input.processed_files_count(),
        })
    }

    /// Extract text for every document in upload order. Placeholder results
    /// (timeouts, rejected files) flow through; a transport error aborts the
    /// whole run.
    async fn extract_documents(
        &self,
        input: &AnalysisInput,
    ) -> Result<Vec<String>, AnalysisError> {
        let AnalysisInput::Documents(documents) = input else {
            return Ok(Vec::new());
        };

        let mut extracted = Vec::with_capacity(documents.len());
        for document in documents {
            extracted.push(self.extractor.extract(document).await?);
        }
        Ok(extracted)
    }

    async fn publish(&self, token: &RunToken, state: AnalysisState) {
        if !token.is_current() {
            debug!(
                case_id = token.key(),
                generation = token.generation(),
                "Discarding state update from superseded run"
            );
            return;
        }
        if let Err(e) = self.store.put(token.key().to_string(), state).await {
            error!(case_id = token.key(), error = %e, "Failed to publish analysis state");
        }
    }
}
