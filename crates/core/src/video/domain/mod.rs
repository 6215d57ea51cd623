pub mod frame_encoder;
pub mod video_source;
