pub mod captured_image;
pub mod challenge_evaluator;
pub mod challenge_state;
pub mod nose_marker_overlay;
pub mod session_phase;
