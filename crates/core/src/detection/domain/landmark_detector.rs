use crate::shared::constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE};
use crate::shared::frame::Frame;

use super::face_mesh::FaceMesh;

/// Domain interface for face-landmark detection.
///
/// Implementations may track a face across frames, hence `&mut self`.
/// Callers submit one frame at a time and wait for its result before
/// submitting the next.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>, Box<dyn std::error::Error>>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorOptions {
    pub max_faces: usize,
    /// Keep the refined (iris) landmarks when the model provides them.
    pub refine_landmarks: bool,
    /// Score a fresh detection must reach.
    pub min_detection_confidence: f64,
    /// Score a tracked face must keep to stay tracked.
    pub min_tracking_confidence: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            max_faces: 1,
            refine_landmarks: true,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl DetectorOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_faces == 0 {
            return Err("max_faces must be at least 1".into());
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0.0 and 1.0, got {value}"));
            }
        }
        Ok(())
    }
}
