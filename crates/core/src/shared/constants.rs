use std::time::Duration;

pub const FACE_MESH_MODEL_NAME: &str = "face_landmark.onnx";

/// Mesh indices of the landmarks the head-turn challenge reads.
pub const NOSE_TIP_INDEX: usize = 1;
pub const LEFT_FACE_EDGE_INDEX: usize = 234;
pub const RIGHT_FACE_EDGE_INDEX: usize = 454;

/// Landmark counts of the plain and refined (iris) face meshes.
pub const MESH_LANDMARKS: usize = 468;
pub const REFINED_MESH_LANDMARKS: usize = 478;

/// |noseOffset| a frame must exceed to count as a turn.
pub const DEFAULT_TURN_THRESHOLD: f64 = 0.12;

/// Face widths below this are treated as a degenerate detection.
pub const MIN_FACE_WIDTH: f64 = 1e-6;

pub const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_millis(400);

pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f64 = 0.6;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const SELFIE_FILE_NAME: &str = "live_selfie.png";
