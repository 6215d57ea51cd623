/// Face-mesh landmark detector using ONNX Runtime via `ort`.
///
/// Runs a single-face landmark model (MediaPipe face-mesh layout: 468 or 478
/// points plus a face-presence logit) on a square crop of the frame. The
/// first crop is the centered square of the frame, which suits selfie
/// framing. Once a face is found, the next crop follows it and the lower
/// tracking threshold applies, mirroring detect-then-track behavior.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::face_mesh::{FaceMesh, LandmarkPoint};
use crate::detection::domain::landmark_detector::{DetectorOptions, LandmarkDetector};
use crate::shared::constants::{MESH_LANDMARKS, REFINED_MESH_LANDMARKS};
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify one.
const DEFAULT_INPUT_SIZE: u32 = 192;

/// Tracking crop side relative to the landmark bounding box.
const TRACKING_ROI_SCALE: f64 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
enum TensorLayout {
    Nhwc,
    Nchw,
}

/// Square crop in frame pixels. May extend past the frame edges; samples
/// outside the frame read as black.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Roi {
    x: f64,
    y: f64,
    size: f64,
}

pub struct OnnxFaceMeshDetector {
    session: ort::session::Session,
    options: DetectorOptions,
    input_size: u32,
    layout: TensorLayout,
    tracked: Option<Roi>,
}

impl OnnxFaceMeshDetector {
    /// Load a face-mesh ONNX model.
    ///
    /// Layout and resolution are read from the model's first input
    /// (`[1, 3, H, W]` or `[1, H, W, 3]`), falling back to 192×192 NHWC.
    pub fn new(
        model_path: &Path,
        options: DetectorOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        options.validate()?;
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let (layout, input_size) = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() < 4 {
                        None
                    } else if shape[1] == 3 && shape[2] > 0 {
                        Some((TensorLayout::Nchw, shape[2] as u32))
                    } else if shape[3] == 3 && shape[1] > 0 {
                        Some((TensorLayout::Nhwc, shape[1] as u32))
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or((TensorLayout::Nhwc, DEFAULT_INPUT_SIZE));

        log::info!(
            "Loaded face mesh model {} ({input_size}x{input_size}, {layout:?})",
            model_path.display()
        );

        Ok(Self {
            session,
            options,
            input_size,
            layout,
            tracked: None,
        })
    }
}

impl LandmarkDetector for OnnxFaceMeshDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceMesh>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (roi, threshold) = match self.tracked {
            Some(roi) => (roi, self.options.min_tracking_confidence),
            None => (centered_square(frame), self.options.min_detection_confidence),
        };

        let input = crop_to_tensor(frame, roi, self.input_size, self.layout);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs are told apart by size: the landmark tensor holds
        // 3 values per point, the face flag is a single logit.
        let mut raw_landmarks: Option<Vec<f32>> = None;
        let mut face_logit: Option<f32> = None;
        for i in 0..outputs.len() {
            let tensor = outputs[i].try_extract_array::<f32>()?;
            let values: Vec<f32> = tensor.iter().copied().collect();
            if values.len() >= MESH_LANDMARKS * 3 && raw_landmarks.is_none() {
                raw_landmarks = Some(values);
            } else if values.len() == 1 && face_logit.is_none() {
                face_logit = Some(values[0]);
            }
        }
        let raw_landmarks = raw_landmarks.ok_or("Face mesh model produced no landmark tensor")?;
        let face_logit = face_logit.ok_or("Face mesh model produced no face score")?;

        let confidence = sigmoid(face_logit as f64);
        if confidence < threshold {
            log::debug!(
                "Face score {confidence:.3} below {threshold:.2} (frame {})",
                frame.index()
            );
            self.tracked = None;
            return Ok(Vec::new());
        }

        let mut mesh = map_landmarks(&raw_landmarks, roi, self.input_size, frame);
        if !self.options.refine_landmarks {
            mesh.truncate(MESH_LANDMARKS);
        } else {
            mesh.truncate(REFINED_MESH_LANDMARKS);
        }
        self.tracked = tracking_roi(&mesh, frame);

        let mut faces = vec![mesh];
        faces.truncate(self.options.max_faces);
        Ok(faces)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn centered_square(frame: &Frame) -> Roi {
    let w = frame.width() as f64;
    let h = frame.height() as f64;
    let size = w.min(h);
    Roi {
        x: (w - size) / 2.0,
        y: (h - size) / 2.0,
        size,
    }
}

/// Square around the mesh bounds, enlarged so the next frame's face still
/// fits after moderate motion. `None` for an empty or collapsed mesh.
fn tracking_roi(mesh: &FaceMesh, frame: &Frame) -> Option<Roi> {
    let (x0, y0, x1, y1) = mesh.bounds()?;
    let w = frame.width() as f64;
    let h = frame.height() as f64;
    let side = ((x1 - x0) * w).max((y1 - y0) * h) * TRACKING_ROI_SCALE;
    if side < 1.0 || !side.is_finite() {
        return None;
    }
    let cx = (x0 + x1) / 2.0 * w;
    let cy = (y0 + y1) / 2.0 * h;
    Some(Roi {
        x: cx - side / 2.0,
        y: cy - side / 2.0,
        size: side,
    })
}

/// Nearest-neighbor crop + resize into a float tensor in `[0, 1]`.
fn crop_to_tensor(frame: &Frame, roi: Roi, input_size: u32, layout: TensorLayout) -> Array4<f32> {
    let n = input_size as usize;
    let mut tensor = match layout {
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, n, n, 3)),
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, n, n)),
    };

    let src = frame.as_ndarray();
    let fw = frame.width() as i64;
    let fh = frame.height() as i64;
    let step = roi.size / input_size as f64;

    for ty in 0..n {
        let sy = (roi.y + (ty as f64 + 0.5) * step).floor() as i64;
        if sy < 0 || sy >= fh {
            continue;
        }
        for tx in 0..n {
            let sx = (roi.x + (tx as f64 + 0.5) * step).floor() as i64;
            if sx < 0 || sx >= fw {
                continue;
            }
            for c in 0..3 {
                let v = src[[sy as usize, sx as usize, c]] as f32 / 255.0;
                match layout {
                    TensorLayout::Nhwc => tensor[[0, ty, tx, c]] = v,
                    TensorLayout::Nchw => tensor[[0, c, ty, tx]] = v,
                }
            }
        }
    }

    tensor
}

/// Maps model-space `(x, y, z)` triples back to frame-normalized points.
fn map_landmarks(raw: &[f32], roi: Roi, input_size: u32, frame: &Frame) -> FaceMesh {
    let scale = roi.size / input_size as f64;
    let w = frame.width() as f64;
    let h = frame.height() as f64;
    let points = raw
        .chunks_exact(3)
        .map(|c| LandmarkPoint {
            x: (roi.x + c[0] as f64 * scale) / w,
            y: (roi.y + c[1] as f64 * scale) / h,
            z: c[2] as f64 * scale / w,
        })
        .collect();
    FaceMesh::new(points)
}
