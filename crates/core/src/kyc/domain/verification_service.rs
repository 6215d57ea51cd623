use serde::Deserialize;

use super::submission::{AiResult, ImageUpload, SubmissionStatus};

/// The AI service's verdict on a document and selfie pair, as sent on the
/// wire (snake_case).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerificationReport {
    pub status: String,
    pub risk_score: Option<f64>,
    pub ocr_text: Option<String>,
    pub face_verified: Option<bool>,
    pub face_distance: Option<f64>,
}

impl VerificationReport {
    pub fn ai_result(&self) -> AiResult {
        AiResult {
            risk_score: self.risk_score,
            ocr_text: self.ocr_text.clone().unwrap_or_default(),
            face_verified: self.face_verified,
            face_distance: self.face_distance,
        }
    }

    /// Only an exact `"Verified"` verifies; anything else rejects.
    pub fn submission_status(&self) -> SubmissionStatus {
        if self.status == "Verified" {
            SubmissionStatus::Verified
        } else {
            SubmissionStatus::Rejected
        }
    }
}

pub trait VerificationService: Send {
    fn verify(
        &self,
        document: &ImageUpload,
        selfie: &ImageUpload,
    ) -> Result<VerificationReport, Box<dyn std::error::Error>>;
}
