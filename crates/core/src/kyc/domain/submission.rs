use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    #[default]
    Pan,
    Aadhaar,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pan => "PAN",
            DocumentType::Aadhaar => "AADHAAR",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PAN" => Ok(DocumentType::Pan),
            "AADHAAR" => Ok(DocumentType::Aadhaar),
            other => Err(format!("unknown document type {other:?}, expected PAN or AADHAAR")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::Verified => "Verified",
            SubmissionStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(SubmissionStatus::Pending),
            "Verified" => Ok(SubmissionStatus::Verified),
            "Rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("unknown submission status {other:?}")),
        }
    }
}

/// What the AI service reported for a submission. Every field is optional
/// on the wire; absent values keep these defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiResult {
    pub risk_score: Option<f64>,
    pub ocr_text: String,
    pub face_verified: Option<bool>,
    pub face_distance: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub document_type: DocumentType,
    pub document_image_path: PathBuf,
    pub selfie_image_path: PathBuf,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub ai_result: AiResult,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record before the repository assigned its id and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSubmission {
    pub full_name: String,
    pub email: String,
    pub document_type: DocumentType,
    pub document_image_path: PathBuf,
    pub selfie_image_path: PathBuf,
}

/// An uploaded image as received: the client's file name and the raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }
}

/// Submission as it arrives from a client, before validation.
#[derive(Clone, Debug, Default)]
pub struct SubmissionRequest {
    pub full_name: String,
    pub email: String,
    pub document_type: Option<DocumentType>,
    pub document: Option<ImageUpload>,
    pub selfie: Option<ImageUpload>,
}

/// A request that passed validation: names trimmed, both images present.
#[derive(Clone, Debug)]
pub struct ValidSubmission {
    pub full_name: String,
    pub email: String,
    pub document_type: DocumentType,
    pub document: ImageUpload,
    pub selfie: ImageUpload,
}

impl SubmissionRequest {
    pub fn validate(self) -> Result<ValidSubmission, SubmissionError> {
        let full_name = self.full_name.trim();
        let email = self.email.trim();
        if full_name.is_empty() || email.is_empty() {
            return Err(SubmissionError::Validation(
                "fullName and email required".to_string(),
            ));
        }
        let (Some(document), Some(selfie)) = (self.document, self.selfie) else {
            return Err(SubmissionError::Validation(
                "document and selfie required".to_string(),
            ));
        };
        Ok(ValidSubmission {
            full_name: full_name.to_string(),
            email: email.to_string(),
            document_type: self.document_type.unwrap_or_default(),
            document,
            selfie,
        })
    }
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(String),
    #[error("storage failed: {0}")]
    Storage(String),
    #[error("AI verification failed for submission {id}: {message}")]
    Verification { id: u64, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn upload(name: &str) -> Option<ImageUpload> {
        Some(ImageUpload::new(name, vec![1, 2, 3]))
    }

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            full_name: "  Asha Rao ".to_string(),
            email: "asha@example.com".to_string(),
            document_type: None,
            document: upload("pan.jpg"),
            selfie: upload("live_selfie.png"),
        }
    }

    #[test]
    fn test_validate_trims_and_defaults_to_pan() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.full_name, "Asha Rao");
        assert_eq!(valid.document_type, DocumentType::Pan);
        assert_eq!(valid.selfie.file_name, "live_selfie.png");
    }

    #[rstest]
    #[case::blank_name("   ", "asha@example.com")]
    #[case::empty_email("Asha", "")]
    fn test_validate_requires_name_and_email(#[case] name: &str, #[case] email: &str) {
        let req = SubmissionRequest {
            full_name: name.to_string(),
            email: email.to_string(),
            ..request()
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "fullName and email required");
    }

    #[test]
    fn test_validate_requires_both_images() {
        let req = SubmissionRequest {
            selfie: None,
            ..request()
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(ref m) if m == "document and selfie required"));
    }

    #[test]
    fn test_name_checked_before_images() {
        let req = SubmissionRequest {
            full_name: String::new(),
            document: None,
            ..request()
        };
        assert_eq!(
            req.validate().unwrap_err().to_string(),
            "fullName and email required"
        );
    }

    #[rstest]
    #[case("PAN", DocumentType::Pan)]
    #[case("aadhaar", DocumentType::Aadhaar)]
    #[case(" Aadhaar ", DocumentType::Aadhaar)]
    fn test_document_type_parses(#[case] input: &str, #[case] expected: DocumentType) {
        assert_eq!(input.parse::<DocumentType>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_document_type_rejected() {
        assert!("passport".parse::<DocumentType>().is_err());
    }

    #[rstest]
    #[case(SubmissionStatus::Pending)]
    #[case(SubmissionStatus::Verified)]
    #[case(SubmissionStatus::Rejected)]
    fn test_status_text_parses_back(#[case] status: SubmissionStatus) {
        assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("verified".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let now = Utc::now();
        let record = SubmissionRecord {
            id: 7,
            full_name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            document_type: DocumentType::Aadhaar,
            document_image_path: PathBuf::from("uploads/doc.jpg"),
            selfie_image_path: PathBuf::from("uploads/selfie.png"),
            status: SubmissionStatus::Verified,
            ai_result: AiResult {
                risk_score: Some(20.0),
                ..AiResult::default()
            },
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fullName"], "Asha Rao");
        assert_eq!(json["documentType"], "AADHAAR");
        assert_eq!(json["status"], "Verified");
        assert_eq!(json["aiResult"]["riskScore"], 20.0);
        assert_eq!(json["aiResult"]["ocrText"], "");
        assert!(json["aiResult"]["faceVerified"].is_null());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_image_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let upload = ImageUpload::from_path(&path).unwrap();
        assert_eq!(upload.file_name, "doc.jpg");
        assert_eq!(upload.bytes, b"jpeg");
    }
}
