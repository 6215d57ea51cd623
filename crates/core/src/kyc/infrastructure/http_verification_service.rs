use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use thiserror::Error;

use crate::kyc::domain::submission::ImageUpload;
use crate::kyc::domain::verification_service::{VerificationReport, VerificationService};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("failed to reach AI service at {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("AI service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed AI service response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the AI service's `POST /verify` endpoint.
pub struct HttpVerificationService {
    client: Client,
    verify_url: String,
}

impl HttpVerificationService {
    pub fn new(base_url: &str) -> Result<Self, VerificationError> {
        let verify_url = format!("{}/verify", base_url.trim_end_matches('/'));
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| VerificationError::Request {
                url: verify_url.clone(),
                source,
            })?;
        Ok(Self { client, verify_url })
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }

    fn send(
        &self,
        document: &ImageUpload,
        selfie: &ImageUpload,
    ) -> Result<VerificationReport, VerificationError> {
        let form = Form::new()
            .part("document", image_part(document))
            .part("selfie", image_part(selfie));

        log::info!("Sending document and selfie to {}", self.verify_url);
        let response = self
            .client
            .post(&self.verify_url)
            .multipart(form)
            .send()
            .map_err(|source| VerificationError::Request {
                url: self.verify_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::warn!("AI service error {status}: {body}");
            return Err(VerificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let report = response
            .json::<VerificationReport>()
            .map_err(VerificationError::Decode)?;
        log::info!(
            "AI service verdict: {} (risk {:?})",
            report.status,
            report.risk_score
        );
        Ok(report)
    }
}

impl VerificationService for HttpVerificationService {
    fn verify(
        &self,
        document: &ImageUpload,
        selfie: &ImageUpload,
    ) -> Result<VerificationReport, Box<dyn std::error::Error>> {
        Ok(self.send(document, selfie)?)
    }
}

fn image_part(upload: &ImageUpload) -> Part {
    Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone())
}
