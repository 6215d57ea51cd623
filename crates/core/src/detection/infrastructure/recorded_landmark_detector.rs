use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::face_mesh::FaceMesh;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("failed to read landmark recording {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed landmark recording {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk landmark recording: faces per frame index.
///
/// ```json
/// { "frames": { "0": [], "1": [[{"x": 0.41, "y": 0.52}, ...]] } }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LandmarkRecording {
    pub frames: HashMap<usize, Vec<FaceMesh>>,
}

impl LandmarkRecording {
    pub fn load(path: &Path) -> Result<Self, RecordingError> {
        let json = fs::read_to_string(path).map_err(|source| RecordingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| RecordingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replays recorded landmark results by frame index.
///
/// Lets a liveness session be rerun deterministically against a captured
/// clip without the face-mesh model. Frames missing from the recording
/// report no face.
pub struct RecordedLandmarkDetector {
    recording: Arc<LandmarkRecording>,
}

impl RecordedLandmarkDetector {
    pub fn new(recording: Arc<LandmarkRecording>) -> Self {
        Self { recording }
    }

    pub fn from_file(path: &Path) -> Result<Self, RecordingError> {
        let recording = LandmarkRecording::load(path)?;
        log::info!(
            "Loaded landmark recording with {} frames from {}",
            recording.frames.len(),
            path.display()
        );
        Ok(Self::new(Arc::new(recording)))
    }
}

impl LandmarkDetector for RecordedLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>, Box<dyn std::error::Error>> {
        Ok(self
            .recording
            .frames
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_mesh::LandmarkPoint;

    fn frame(index: usize) -> Frame {
        Frame::filled(4, 4, [0, 0, 0], index)
    }

    fn mesh(x: f64) -> FaceMesh {
        FaceMesh::new(vec![LandmarkPoint::new(x, 0.5)])
    }

    #[test]
    fn test_replays_faces_for_known_frame() {
        let recording = LandmarkRecording {
            frames: HashMap::from([(0, vec![mesh(0.3)]), (1, vec![])]),
        };
        let mut detector = RecordedLandmarkDetector::new(Arc::new(recording));

        assert_eq!(detector.detect(&frame(0)).unwrap(), vec![mesh(0.3)]);
        assert!(detector.detect(&frame(1)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_frame_has_no_face() {
        let mut detector = RecordedLandmarkDetector::new(Arc::new(LandmarkRecording::default()));
        assert!(detector.detect(&frame(42)).unwrap().is_empty());
    }

    #[test]
    fn test_loads_recording_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landmarks.json");
        fs::write(
            &path,
            r#"{"frames": {"2": [[{"x": 0.1, "y": 0.2}, {"x": 0.3, "y": 0.4, "z": -0.01}]]}}"#,
        )
        .unwrap();

        let mut detector = RecordedLandmarkDetector::from_file(&path).unwrap();
        let faces = detector.detect(&frame(2)).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].len(), 2);
        assert_eq!(faces[0].point(1).unwrap().z, -0.01);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RecordedLandmarkDetector::from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(RecordingError::Read { .. })));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let result = RecordedLandmarkDetector::from_file(&path);
        assert!(matches!(result, Err(RecordingError::Parse { .. })));
    }
}
