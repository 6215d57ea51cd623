use serde::Serialize;

use super::submission::{SubmissionRecord, SubmissionStatus};

/// Status counts for the admin listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionStats {
    pub total: usize,
    pub verified: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl SubmissionStats {
    pub fn from_records(records: &[SubmissionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total += 1;
            match record.status {
                SubmissionStatus::Verified => stats.verified += 1,
                SubmissionStatus::Rejected => stats.rejected += 1,
                SubmissionStatus::Pending => stats.pending += 1,
            }
            stats
        })
    }
}
