//! In-memory store, loadable from a JSON fixture file.

use std::collections::HashMap;
use std::path::Path;

use lexmatch_core::{CaseHistory, CaseRecord, LawyerDirectory, LawyerRecord, SourceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::StoreError;

/// Lawyers and cases held in memory.
///
/// The JSON layout is `{"lawyers": [...], "cases": [...]}`; either list may
/// be omitted. Cases reference lawyers by `lawyer_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub lawyers: Vec<LawyerRecord>,
    #[serde(default)]
    pub cases: Vec<CaseRecord>,
}

impl MemoryStore {
    pub fn new(lawyers: Vec<LawyerRecord>, cases: Vec<CaseRecord>) -> Self {
        Self { lawyers, cases }
    }

    /// Load a JSON fixture file.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&text)?;
        info!(
            lawyers = store.lawyers.len(),
            cases = store.cases.len(),
            path = %path.display(),
            "loaded json store"
        );
        Ok(store)
    }

    /// Write the store back out as pretty-printed JSON.
    pub fn save_json_file(&self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl CaseHistory for MemoryStore {
    fn find_closed_cases_with_assigned_lawyer(
        &self,
    ) -> Result<Vec<(CaseRecord, LawyerRecord)>, SourceError> {
        let by_id: HashMap<i64, &LawyerRecord> = self.lawyers.iter().map(|l| (l.id, l)).collect();

        let mut out = Vec::new();
        for case in self.cases.iter().filter(|c| c.status.is_closed()) {
            let Some(lawyer_id) = case.lawyer_id else {
                continue;
            };
            match by_id.get(&lawyer_id) {
                Some(lawyer) => out.push((case.clone(), (*lawyer).clone())),
                None => warn!(case = case.id, lawyer_id, "closed case references unknown lawyer"),
            }
        }
        Ok(out)
    }
}

impl LawyerDirectory for MemoryStore {
    fn find_all_lawyers(&self) -> Result<Vec<LawyerRecord>, SourceError> {
        Ok(self.lawyers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexmatch_core::CaseStatus;

    fn lawyer(id: i64) -> LawyerRecord {
        LawyerRecord {
            id,
            name: format!("lawyer {id}"),
            experience: Some("5 years".into()),
            cases_handled: Some(40),
            specializations: vec!["Civil".into()],
            credentials_verified: Some(true),
        }
    }

    fn case(id: i64, status: CaseStatus, lawyer_id: Option<i64>) -> CaseRecord {
        CaseRecord {
            id,
            case_type: Some("Civil".into()),
            urgency: None,
            status,
            lawyer_id,
        }
    }

    #[test]
    fn closed_cases_join_assigned_lawyer() {
        let store = MemoryStore::new(
            vec![lawyer(1), lawyer(2)],
            vec![
                case(10, CaseStatus::Completed, Some(1)),
                case(11, CaseStatus::Accepted, Some(2)),
                case(12, CaseStatus::Completed, None),
                case(13, CaseStatus::Completed, Some(2)),
            ],
        );
        let pairs = store.find_closed_cases_with_assigned_lawyer().unwrap();
        let ids: Vec<(i64, i64)> = pairs.iter().map(|(c, l)| (c.id, l.id)).collect();
        assert_eq!(ids, vec![(10, 1), (13, 2)]);
    }

    #[test]
    fn dangling_lawyer_reference_is_skipped() {
        let store = MemoryStore::new(
            vec![lawyer(1)],
            vec![case(10, CaseStatus::Completed, Some(99))],
        );
        assert!(store.find_closed_cases_with_assigned_lawyer().unwrap().is_empty());
    }

    #[test]
    fn directory_returns_unverified_lawyers_too() {
        let mut unverified = lawyer(2);
        unverified.credentials_verified = Some(false);
        let store = MemoryStore::new(vec![lawyer(1), unverified], vec![]);
        assert_eq!(store.find_all_lawyers().unwrap().len(), 2);
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = MemoryStore::new(
            vec![lawyer(1)],
            vec![case(10, CaseStatus::Completed, Some(1))],
        );
        store.save_json_file(&path).unwrap();

        let loaded = MemoryStore::from_json_file(&path).unwrap();
        assert_eq!(loaded.lawyers, store.lawyers);
        assert_eq!(loaded.cases, store.cases);
    }

    #[test]
    fn json_with_only_lawyers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("lawyers.json");
        std::fs::write(
            &path,
            r#"{"lawyers": [{"id": 3, "experience": "8 yrs", "specializations": ["Family"]}]}"#,
        )
        .unwrap();
        let store = MemoryStore::from_json_file(&path).unwrap();
        assert_eq!(store.lawyers.len(), 1);
        assert!(store.cases.is_empty());
        assert_eq!(store.lawyers[0].credentials_verified, None);
    }

    #[test]
    fn missing_file_errors() {
        let err = MemoryStore::from_json_file(Path::new("/nonexistent/store.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
