use chrono::{Datelike, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

use crate::models::{Case, CaseStatus, CreateCaseRequest};

/// In-memory case registry. Owns every `Case`; the analysis pipeline only
/// reads case identity from here.
pub struct CaseRegistry {
    cases: DashMap<String, Case>,
    next_seq: AtomicU32,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self {
            cases: DashMap::new(),
            next_seq: AtomicU32::new(1),
        }
    }

    /// Registry pre-loaded with demo cases for local runs.
    pub fn with_demo_cases() -> Self {
        let registry = Self::new();
        for case in demo_cases() {
            registry.cases.insert(case.id.clone(), case);
        }
        registry.next_seq.store(5, Ordering::SeqCst);
        registry
    }

    pub fn list(&self) -> Vec<Case> {
        let mut cases: Vec<Case> = self.cases.iter().map(|entry| entry.clone()).collect();
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        cases
    }

    pub fn get(&self, id: &str) -> Option<Case> {
        self.cases.get(id).map(|entry| entry.clone())
    }

    pub fn create(&self, request: CreateCaseRequest) -> Case {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let case = Case {
            id: format!("CS-{}-{:03}", now.year(), seq),
            applicant_name: request.applicant_name,
            applicant_pesel: request.applicant_pesel,
            accident_date: request.accident_date,
            business_type: request.business_type,
            status: CaseStatus::New,
            submission_date: now.date_naive().to_string(),
            risk_score: 0,
        };
        info!(case_id = %case.id, "Case registered");
        self.cases.insert(case.id.clone(), case.clone());
        case
    }

    pub fn set_status(&self, id: &str, status: CaseStatus) -> Option<Case> {
        let mut entry = self.cases.get_mut(id)?;
        entry.status = status;
        Some(entry.clone())
    }

    pub fn set_risk_score(&self, id: &str, risk_score: u8) -> Option<Case> {
        let mut entry = self.cases.get_mut(id)?;
        entry.risk_score = risk_score;
        Some(entry.clone())
    }
}

impl Default for CaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_cases() -> Vec<Case> {
    vec![
        Case {
            id: "CS-2025-001".to_string(),
            applicant_name: "Jan Kowalski".to_string(),
            applicant_pesel: "85010112345".to_string(),
            accident_date: "2025-05-12".to_string(),
            business_type: "Usługi Budowlane".to_string(),
            status: CaseStatus::New,
            submission_date: "2025-05-14".to_string(),
            risk_score: 0,
        },
        Case {
            id: "CS-2025-002".to_string(),
            applicant_name: "Anna Nowak".to_string(),
            applicant_pesel: "92031554321".to_string(),
            accident_date: "2025-05-10".to_string(),
            business_type: "Programowanie".to_string(),
            status: CaseStatus::Analyzing,
            submission_date: "2025-05-11".to_string(),
            risk_score: 35,
        },
        Case {
            id: "CS-2025-003".to_string(),
            applicant_name: "Marek Zając".to_string(),
            applicant_pesel: "78112009876".to_string(),
            accident_date: "2025-04-28".to_string(),
            business_type: "Transport Drogowy".to_string(),
            status: CaseStatus::OpinionDraft,
            submission_date: "2025-05-01".to_string(),
            risk_score: 80,
        },
        Case {
            id: "CS-2025-004".to_string(),
            applicant_name: "Ewa Wiśniewska".to_string(),
            applicant_pesel: "88070711223".to_string(),
            accident_date: "2025-05-05".to_string(),
            business_type: "Fryzjerstwo".to_string(),
            status: CaseStatus::CardReady,
            submission_date: "2025-05-06".to_string(),
            risk_score: 10,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateCaseRequest {
        CreateCaseRequest {
            applicant_name: name.to_string(),
            applicant_pesel: "90010100000".to_string(),
            accident_date: "2025-06-01".to_string(),
            business_type: "Stolarstwo".to_string(),
        }
    }

    #[test]
    fn creates_cases_with_sequential_ids_and_defaults() {
        let registry = CaseRegistry::new();

        let first = registry.create(request("A"));
        let second = registry.create(request("B"));

        assert!(first.id.starts_with("CS-"));
        assert!(first.id.ends_with("-001"));
        assert!(second.id.ends_with("-002"));
        assert_eq!(first.status, CaseStatus::New);
        assert_eq!(first.risk_score, 0);
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn demo_registry_continues_the_sequence() {
        let registry = CaseRegistry::with_demo_cases();
        assert_eq!(registry.list().len(), 4);

        let created = registry.create(request("C"));
        assert!(created.id.ends_with("-005"));
        assert!(registry.get(&created.id).is_some());
    }

    #[test]
    fn updates_touch_only_known_cases() {
        let registry = CaseRegistry::new();
        let case = registry.create(request("A"));

        let updated = registry.set_status(&case.id, CaseStatus::Analyzing).unwrap();
        assert_eq!(updated.status, CaseStatus::Analyzing);

        let scored = registry.set_risk_score(&case.id, 80).unwrap();
        assert_eq!(scored.risk_score, 80);

        assert!(registry.set_status("CS-2025-999", CaseStatus::Closed).is_none());
        assert!(registry.set_risk_score("CS-2025-999", 1).is_none());
    }
}
