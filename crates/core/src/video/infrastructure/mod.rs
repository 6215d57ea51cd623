pub mod ffmpeg_video_source;
pub mod image_sequence_source;
pub mod png_frame_encoder;
