//! Horizontal head rotation estimated from face-mesh geometry.
//!
//! The nose tip sits midway between the face edges when looking straight at
//! the camera and slides toward one edge as the head turns. Dividing that
//! shift by the edge-to-edge width makes the signal independent of how close
//! the face is to the camera.

use crate::shared::constants::{
    LEFT_FACE_EDGE_INDEX, MIN_FACE_WIDTH, NOSE_TIP_INDEX, RIGHT_FACE_EDGE_INDEX,
};

use super::face_mesh::FaceMesh;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSignal {
    /// `(nose.x - center_x) / face_width`. Negative = turned left.
    pub nose_offset: f64,
    pub face_width: f64,
}

impl PoseSignal {
    /// Derives the signal from the fixed edge and nose landmarks.
    ///
    /// Returns `None` when the mesh lacks those landmarks or the face width
    /// is below [`MIN_FACE_WIDTH`].
    pub fn from_mesh(mesh: &FaceMesh) -> Option<Self> {
        let left = mesh.point(LEFT_FACE_EDGE_INDEX)?;
        let right = mesh.point(RIGHT_FACE_EDGE_INDEX)?;
        let nose = mesh.point(NOSE_TIP_INDEX)?;
        Self::from_points(left.x, right.x, nose.x)
    }

    pub fn from_points(left_x: f64, right_x: f64, nose_x: f64) -> Option<Self> {
        let face_width = (right_x - left_x).abs();
        if !face_width.is_finite() || face_width < MIN_FACE_WIDTH {
            return None;
        }
        let center_x = (left_x + right_x) / 2.0;
        let nose_offset = (nose_x - center_x) / face_width;
        nose_offset.is_finite().then_some(Self {
            nose_offset,
            face_width,
        })
    }
}
