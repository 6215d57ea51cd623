use super::submission::{NewSubmission, SubmissionRecord};

/// Persistent store of submission records.
pub trait SubmissionRepository: Send {
    /// Assigns an id and timestamps, persists, and returns the new record.
    fn create(
        &mut self,
        submission: NewSubmission,
    ) -> Result<SubmissionRecord, Box<dyn std::error::Error>>;

    /// Replaces the stored record with the same id.
    fn save(&mut self, record: &SubmissionRecord) -> Result<(), Box<dyn std::error::Error>>;

    /// Returns `false` if no record had this id.
    fn delete(&mut self, id: u64) -> Result<bool, Box<dyn std::error::Error>>;

    /// All records in storage order.
    fn list(&self) -> Result<Vec<SubmissionRecord>, Box<dyn std::error::Error>>;
}
