pub mod onnx_face_mesh_detector;
pub mod recorded_landmark_detector;
