use serde::Serialize;

use crate::kyc::domain::submission::{SubmissionError, SubmissionRecord};
use crate::kyc::domain::submission_repository::SubmissionRepository;
use crate::kyc::domain::submission_stats::SubmissionStats;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionListing {
    pub submissions: Vec<SubmissionRecord>,
    pub stats: SubmissionStats,
}

/// Admin view: every submission, newest first, with status counts.
pub struct ListSubmissionsUseCase {
    repository: Box<dyn SubmissionRepository>,
}

impl ListSubmissionsUseCase {
    pub fn new(repository: Box<dyn SubmissionRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(&self) -> Result<SubmissionListing, SubmissionError> {
        let mut submissions = self
            .repository
            .list()
            .map_err(|e| SubmissionError::Storage(e.to_string()))?;
        submissions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let stats = SubmissionStats::from_records(&submissions);
        Ok(SubmissionListing { submissions, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kyc::domain::submission::{NewSubmission, SubmissionStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use std::path::PathBuf;

    struct FixedRepository {
        records: Vec<SubmissionRecord>,
    }

    impl SubmissionRepository for FixedRepository {
        fn create(
            &mut self,
            _s: NewSubmission,
        ) -> Result<SubmissionRecord, Box<dyn std::error::Error>> {
            Err("read-only".into())
        }

        fn save(&mut self, _r: &SubmissionRecord) -> Result<(), Box<dyn std::error::Error>> {
            Err("read-only".into())
        }

        fn delete(&mut self, _id: u64) -> Result<bool, Box<dyn std::error::Error>> {
            Err("read-only".into())
        }

        fn list(&self) -> Result<Vec<SubmissionRecord>, Box<dyn std::error::Error>> {
            if self.records.is_empty() {
                return Err("disk unavailable".into());
            }
            Ok(self.records.clone())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn record(id: u64, created_secs: i64, status: SubmissionStatus) -> SubmissionRecord {
        SubmissionRecord {
            id,
            full_name: format!("User {id}"),
            email: format!("user{id}@example.com"),
            document_type: Default::default(),
            document_image_path: PathBuf::from("doc.jpg"),
            selfie_image_path: PathBuf::from("selfie.png"),
            status,
            ai_result: Default::default(),
            created_at: at(created_secs),
            updated_at: at(created_secs),
        }
    }

    #[test]
    fn test_newest_first_with_id_tiebreak() {
        let use_case = ListSubmissionsUseCase::new(Box::new(FixedRepository {
            records: vec![
                record(1, 0, SubmissionStatus::Verified),
                record(2, 50, SubmissionStatus::Rejected),
                record(3, 10, SubmissionStatus::Pending),
                record(4, 50, SubmissionStatus::Verified),
            ],
        }));

        let listing = use_case.execute().unwrap();

        let ids: Vec<u64> = listing.submissions.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
        assert_eq!(
            listing.stats,
            SubmissionStats {
                total: 4,
                verified: 2,
                rejected: 1,
                pending: 1,
            }
        );
    }

    #[test]
    fn test_listing_serializes_for_admin_view() {
        let use_case = ListSubmissionsUseCase::new(Box::new(FixedRepository {
            records: vec![record(1, 0, SubmissionStatus::Pending)],
        }));

        let json = serde_json::to_value(use_case.execute().unwrap()).unwrap();
        assert_eq!(json["stats"]["pending"], 1);
        assert_eq!(json["submissions"][0]["fullName"], "User 1");
    }

    #[test]
    fn test_repository_error_is_storage_error() {
        let use_case = ListSubmissionsUseCase::new(Box::new(FixedRepository {
            records: Vec::new(),
        }));
        let err = use_case.execute().unwrap_err();
        assert!(matches!(err, SubmissionError::Storage(ref m) if m == "disk unavailable"));
    }
}
