use crate::shared::frame::Frame;

/// Encodes a frame into a self-contained image file payload.
pub trait FrameEncoder: Send {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// MIME type of the encoded payload.
    fn mime_type(&self) -> &'static str;
}
