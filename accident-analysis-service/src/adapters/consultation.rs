use anyhow::anyhow;
use chrono::Utc;
use rig::completion::Prompt;
use serde::Deserialize;
use tracing::info;

use super::llm::{build_agent, extract_json_object};
use crate::models::{ConsultationConclusion, MedicalOpinion};

const CONSULTANT_MODEL: &str = "openai/gpt-4o";

const CONSULTANT_PROMPT: &str = r#"You are the chief certifying physician of the social-insurance institution.
Your task is to issue a medical opinion based on the case documentation and the analyst's question.

Rules:
1. Rely on medical knowledge and certification case law.
2. Be specific, factual and formal.
3. Assess the causal link between the event and the injury.
4. Distinguish traumatic (accident) injuries from spontaneous (disease) conditions.

Return JSON:
{
  "doctor_opinion": "The medical opinion text...",
  "conclusion": "injury_confirmed" | "disease_confirmed" | "insufficient_data",
  "icd10_suggestion": "ICD-10 code, if determinable"
}"#;

#[derive(Debug, Deserialize)]
struct RawOpinion {
    #[serde(default)]
    doctor_opinion: String,
    conclusion: ConsultationConclusion,
    #[serde(default)]
    icd10_suggestion: Option<String>,
}

/// On-demand medical consultation, independent of the analysis pipeline.
pub struct MedicalConsultationClient {
    api_key: String,
}

impl MedicalConsultationClient {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    pub async fn consult(
        &self,
        question: &str,
        case_context: &str,
    ) -> anyhow::Result<MedicalOpinion> {
        info!("Requesting medical consultation");

        let agent = build_agent(&self.api_key, CONSULTANT_MODEL, CONSULTANT_PROMPT);
        let message = format!(
            "CASE CONTEXT:\n{}\n\nQUESTION FOR THE PHYSICIAN:\n{}",
            case_context, question
        );

        let response = agent.prompt(message.as_str()).await?;
        let raw = parse_opinion(&response)?;

        Ok(MedicalOpinion {
            doctor_opinion: raw.doctor_opinion,
            conclusion: raw.conclusion,
            icd10_suggestion: raw
                .icd10_suggestion
                .filter(|code| !code.trim().is_empty()),
            issued_at: Utc::now(),
        })
    }
}

fn parse_opinion(response: &str) -> anyhow::Result<RawOpinion> {
    serde_json::from_str(extract_json_object(response))
        .map_err(|e| anyhow!("unparseable consultation response: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_opinion() {
        let raw = parse_opinion(
            r#"{"doctor_opinion": "The wrist fracture is consistent with a fall.",
                "conclusion": "injury_confirmed",
                "icd10_suggestion": "S52.5"}"#,
        )
        .unwrap();

        assert_eq!(raw.conclusion, ConsultationConclusion::InjuryConfirmed);
        assert_eq!(raw.icd10_suggestion.as_deref(), Some("S52.5"));
    }

    #[test]
    fn parses_a_fenced_opinion_without_a_code() {
        let raw = parse_opinion(
            "```json\n{\"doctor_opinion\": \"Records are incomplete.\", \"conclusion\": \"insufficient_data\"}\n```",
        )
        .unwrap();

        assert_eq!(raw.conclusion, ConsultationConclusion::InsufficientData);
        assert!(raw.icd10_suggestion.is_none());
    }

    #[test]
    fn unknown_conclusion_is_an_error() {
        let result = parse_opinion(r#"{"doctor_opinion": "x", "conclusion": "maybe"}"#);
        assert!(result.is_err());
    }
}
