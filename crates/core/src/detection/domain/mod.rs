pub mod face_mesh;
pub mod head_pose;
pub mod landmark_detector;
