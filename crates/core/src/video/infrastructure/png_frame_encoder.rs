use std::io::Cursor;

use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;

/// Lossless PNG encoding of RGB frames using the `image` crate.
pub struct PngFrameEncoder;

impl PngFrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngFrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for PngFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err("Cannot encode an empty frame".into());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }
}
