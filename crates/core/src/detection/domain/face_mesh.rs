//! Dense face-mesh landmarks in frame-normalized coordinates.

use serde::{Deserialize, Serialize};

/// A landmark position. `x` and `y` are normalized to the frame (0.0 = left
/// or top edge, 1.0 = right or bottom edge); `z` is relative depth and may be
/// zero for 2D detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Landmarks of one detected face, in the detector's fixed index order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceMesh {
    points: Vec<LandmarkPoint>,
}

impl FaceMesh {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<LandmarkPoint> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.points.truncate(len);
    }

    /// Normalized `(min_x, min_y, max_x, max_y)` over all points, or `None`
    /// for an empty mesh.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        ))
    }
}
