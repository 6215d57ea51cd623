use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use livecheck_core::detection::domain::landmark_detector::DetectorOptions;
use livecheck_core::liveness::domain::challenge_evaluator::ChallengeConfig;
use livecheck_core::pipeline::liveness_pipeline::LivenessConfig;
use livecheck_core::pipeline::submit_kyc_use_case::VerificationFailurePolicy;
use livecheck_core::shared::constants::{
    DEFAULT_CAPTURE_DELAY, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE,
    DEFAULT_READY_POLL_INTERVAL, DEFAULT_TURN_THRESHOLD,
};

const APP_DIR: &str = "LiveCheck";

/// Defaults for every subcommand. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub turn_threshold: f64,
    pub capture_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub ready_timeout_ms: Option<u64>,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
    pub refine_landmarks: bool,
    pub model_url: Option<String>,
    pub ai_service_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub failure_policy: VerificationFailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            turn_threshold: DEFAULT_TURN_THRESHOLD,
            capture_delay_ms: DEFAULT_CAPTURE_DELAY.as_millis() as u64,
            poll_interval_ms: DEFAULT_READY_POLL_INTERVAL.as_millis() as u64,
            ready_timeout_ms: None,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
            refine_landmarks: true,
            model_url: None,
            ai_service_url: None,
            data_dir: None,
            failure_policy: VerificationFailurePolicy::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("settings.json"))
    }

    /// Loads `explicit` if given, else the per-user settings file.
    pub fn load(explicit: Option<&Path>) -> Self {
        match explicit.map(Path::to_path_buf).or_else(Self::config_path) {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// A missing file yields defaults silently; an unreadable or malformed
    /// one yields defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => {
                log::debug!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn liveness_config(&self) -> LivenessConfig {
        LivenessConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            capture_delay: Duration::from_millis(self.capture_delay_ms),
            ready_timeout: self.ready_timeout_ms.map(Duration::from_millis),
            challenge: ChallengeConfig {
                turn_threshold: self.turn_threshold,
            },
        }
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            refine_landmarks: self.refine_landmarks,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            ..DetectorOptions::default()
        }
    }

    /// Configured directory, else the per-user data directory, else a
    /// directory under the working directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("livecheck-data"))
    }
}
