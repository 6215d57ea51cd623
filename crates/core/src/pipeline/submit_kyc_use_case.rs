use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::kyc::domain::submission::{
    NewSubmission, SubmissionError, SubmissionRecord, SubmissionRequest, SubmissionStatus,
};
use crate::kyc::domain::submission_repository::SubmissionRepository;
use crate::kyc::domain::upload_store::UploadStore;
use crate::kyc::domain::verification_service::VerificationService;

/// What happens to a freshly created record when the AI call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationFailurePolicy {
    /// Keep the record as `Pending` for a later retry.
    #[default]
    LeavePending,
    MarkRejected,
    /// Remove the record and its stored uploads.
    Delete,
}

impl FromStr for VerificationFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave-pending" => Ok(Self::LeavePending),
            "mark-rejected" => Ok(Self::MarkRejected),
            "delete" => Ok(Self::Delete),
            other => Err(format!(
                "unknown failure policy {other:?}, expected leave-pending, mark-rejected or delete"
            )),
        }
    }
}

/// Validates a submission, stores its images, records it, and asks the AI
/// service for a verdict.
pub struct SubmitKycUseCase {
    repository: Box<dyn SubmissionRepository>,
    uploads: Box<dyn UploadStore>,
    verifier: Box<dyn VerificationService>,
    failure_policy: VerificationFailurePolicy,
}

impl SubmitKycUseCase {
    pub fn new(
        repository: Box<dyn SubmissionRepository>,
        uploads: Box<dyn UploadStore>,
        verifier: Box<dyn VerificationService>,
        failure_policy: VerificationFailurePolicy,
    ) -> Self {
        Self {
            repository,
            uploads,
            verifier,
            failure_policy,
        }
    }

    pub fn execute(
        &mut self,
        request: SubmissionRequest,
    ) -> Result<SubmissionRecord, SubmissionError> {
        let submission = request.validate()?;

        let document_image_path = self
            .uploads
            .store(&submission.document)
            .map_err(|e| SubmissionError::Storage(e.to_string()))?;
        let selfie_image_path = match self.uploads.store(&submission.selfie) {
            Ok(path) => path,
            Err(e) => {
                self.discard_uploads(&[document_image_path]);
                return Err(SubmissionError::Storage(e.to_string()));
            }
        };

        let created = self.repository.create(NewSubmission {
            full_name: submission.full_name,
            email: submission.email,
            document_type: submission.document_type,
            document_image_path: document_image_path.clone(),
            selfie_image_path: selfie_image_path.clone(),
        });
        let mut record = match created {
            Ok(record) => record,
            Err(e) => {
                self.discard_uploads(&[document_image_path, selfie_image_path]);
                return Err(SubmissionError::Storage(e.to_string()));
            }
        };
        log::info!("Created submission {} ({})", record.id, record.document_type);

        let report = match self.verifier.verify(&submission.document, &submission.selfie) {
            Ok(report) => report,
            Err(e) => {
                let message = e.to_string();
                log::warn!("Verification of submission {} failed: {message}", record.id);
                self.apply_failure_policy(&mut record);
                return Err(SubmissionError::Verification {
                    id: record.id,
                    message,
                });
            }
        };

        record.ai_result = report.ai_result();
        record.status = report.submission_status();
        record.updated_at = Utc::now();
        self.repository
            .save(&record)
            .map_err(|e| SubmissionError::Storage(e.to_string()))?;
        log::info!("Submission {} is {}", record.id, record.status);
        Ok(record)
    }

    /// Best effort: failures here are logged, the verification error wins.
    fn apply_failure_policy(&mut self, record: &mut SubmissionRecord) {
        match self.failure_policy {
            VerificationFailurePolicy::LeavePending => {}
            VerificationFailurePolicy::MarkRejected => {
                record.status = SubmissionStatus::Rejected;
                record.updated_at = Utc::now();
                if let Err(e) = self.repository.save(record) {
                    log::warn!("Could not mark submission {} rejected: {e}", record.id);
                }
            }
            VerificationFailurePolicy::Delete => {
                if let Err(e) = self.repository.delete(record.id) {
                    log::warn!("Could not delete submission {}: {e}", record.id);
                }
                self.discard_uploads(&[
                    record.document_image_path.clone(),
                    record.selfie_image_path.clone(),
                ]);
            }
        }
    }

    /// Best effort removal of uploads that no record refers to.
    fn discard_uploads(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = self.uploads.remove(path) {
                log::warn!("Could not remove upload {}: {e}", path.display());
            }
        }
    }
}
