use async_trait::async_trait;
use rig::completion::Prompt;
use serde::Deserialize;
use tracing::{debug, info};

use super::llm::{build_agent, extract_json_object};
use crate::error::AnalysisError;
use crate::models::{Calculation, LegalAssessment, Recommendation};

// The input is already structured and the output space is small, so the
// lighter model is enough here.
const SCORING_MODEL: &str = "openai/gpt-4o-mini";

const SCORING_PROMPT: &str = r#"You are the actuarial scoring agent for workplace-accident assessments.
INPUT: JSON with the verified accident criteria.
POLICY:
- If any criterion is null (missing data / read error) -> confidence 0. Recommendation: NEEDS_CLARIFICATION.
- If any criterion is false -> confidence below 20.
- If discrepancies are present -> subtract 20 points.
- If everything is true and there are no discrepancies -> confidence above 90.

Return JSON:
{
  "confidence_score": number,
  "recommendation_short": "ACCEPT" | "REJECT" | "NEEDS_CLARIFICATION",
  "reasoning_short": "One sentence."
}"#;

/// Scores one legal assessment. Stateless; consumes only the previous
/// stage's JSON, never the raw documents.
#[async_trait]
pub trait ConfidenceScorer: Send + Sync {
    async fn score(&self, assessment: &LegalAssessment) -> Result<Calculation, AnalysisError>;
}

/// Calculation as returned by the model, before the policy pass.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCalculation {
    pub confidence_score: f64,
    pub recommendation_short: Recommendation,
    #[serde(default)]
    pub reasoning_short: String,
}

pub struct ScoringClient {
    api_key: String,
}

impl ScoringClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl ConfidenceScorer for ScoringClient {
    async fn score(&self, assessment: &LegalAssessment) -> Result<Calculation, AnalysisError> {
        let payload =
            serde_json::to_string(assessment).map_err(|e| AnalysisError::Scoring(e.to_string()))?;

        let agent = build_agent(&self.api_key, SCORING_MODEL, SCORING_PROMPT);
        let response = agent
            .prompt(payload.as_str())
            .await
            .map_err(|e| AnalysisError::Scoring(e.to_string()))?;

        debug!(response = %response, "Scoring agent response");

        let raw: RawCalculation = serde_json::from_str(extract_json_object(&response))
            .map_err(|e| AnalysisError::Scoring(format!("unparseable scoring response: {}", e)))?;

        let calculation = enforce_scoring_rules(assessment, raw);
        info!(
            score = calculation.confidence_score,
            recommendation = ?calculation.recommendation_short,
            "Confidence calculated"
        );
        Ok(calculation)
    }
}

/// Pin the model-produced calculation to the scoring policy. The model is
/// prompted with the same rules, but the published numbers must obey them
/// even when the model drifts.
pub(crate) fn enforce_scoring_rules(
    assessment: &LegalAssessment,
    raw: RawCalculation,
) -> Calculation {
    if assessment.criteria.any_undetermined() {
        return Calculation {
            confidence_score: 0,
            recommendation_short: Recommendation::NeedsClarification,
            reasoning_short: raw.reasoning_short,
        };
    }

    let mut score = raw.confidence_score.round().clamp(0.0, 100.0) as u8;

    if assessment.criteria.any_not_met() {
        score = score.min(19);
    }
    if !assessment.discrepancies.is_empty() {
        score = score.min(80);
    }
    if assessment.criteria.all_met() && assessment.discrepancies.is_empty() {
        score = score.max(91);
    }

    Calculation {
        confidence_score: score,
        recommendation_short: raw.recommendation_short,
        reasoning_short: raw.reasoning_short,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriteriaVerdicts, CriterionVerdict};

    fn assessment(criteria: CriteriaVerdicts, discrepancies: Vec<String>) -> LegalAssessment {
        LegalAssessment {
            criteria,
            discrepancies,
            ..LegalAssessment::default()
        }
    }

    fn all_met() -> CriteriaVerdicts {
        CriteriaVerdicts {
            suddenness: CriterionVerdict::Met,
            external_cause: CriterionVerdict::Met,
            injury: CriterionVerdict::Met,
            work_connection: CriterionVerdict::Met,
        }
    }

    fn raw(score: f64, recommendation: Recommendation) -> RawCalculation {
        RawCalculation {
            confidence_score: score,
            recommendation_short: recommendation,
            reasoning_short: "Because.".to_string(),
        }
    }

    #[test]
    fn undetermined_criterion_forces_zero_and_clarification() {
        let criteria = CriteriaVerdicts {
            injury: CriterionVerdict::Undetermined,
            ..all_met()
        };
        // even when the model claims high confidence
        let calc = enforce_scoring_rules(
            &assessment(criteria, Vec::new()),
            raw(95.0, Recommendation::Accept),
        );

        assert_eq!(calc.confidence_score, 0);
        assert_eq!(calc.recommendation_short, Recommendation::NeedsClarification);
    }

    #[test]
    fn not_met_criterion_caps_below_twenty() {
        let criteria = CriteriaVerdicts {
            work_connection: CriterionVerdict::NotMet,
            ..all_met()
        };
        let calc = enforce_scoring_rules(
            &assessment(criteria, Vec::new()),
            raw(85.0, Recommendation::Reject),
        );

        assert!(calc.confidence_score < 20);
        assert_eq!(calc.recommendation_short, Recommendation::Reject);
    }

    #[test]
    fn discrepancies_cap_the_score() {
        let calc = enforce_scoring_rules(
            &assessment(all_met(), vec!["accident date differs".to_string()]),
            raw(97.0, Recommendation::Accept),
        );

        assert_eq!(calc.confidence_score, 80);
    }

    #[test]
    fn clean_all_met_case_scores_above_ninety() {
        let calc = enforce_scoring_rules(
            &assessment(all_met(), Vec::new()),
            // a drifting model lowballs; the policy floor still applies
            raw(70.0, Recommendation::Accept),
        );

        assert!(calc.confidence_score > 90);
        assert_eq!(calc.recommendation_short, Recommendation::Accept);
    }

    #[test]
    fn score_is_clamped_to_the_percent_range() {
        let low = enforce_scoring_rules(
            &assessment(
                CriteriaVerdicts {
                    injury: CriterionVerdict::NotMet,
                    ..all_met()
                },
                Vec::new(),
            ),
            raw(-5.0, Recommendation::Reject),
        );
        assert_eq!(low.confidence_score, 0);

        let high = enforce_scoring_rules(
            &assessment(all_met(), Vec::new()),
            raw(250.0, Recommendation::Accept),
        );
        assert_eq!(high.confidence_score, 100);
    }
}
