use crate::shared::frame::Frame;

/// A live or recorded frame feed.
///
/// Implementations handle device and codec details while the liveness
/// pipeline works with the abstract [`Frame`]. Frames are pulled on demand,
/// one at a time, so a slow consumer naturally throttles the source.
pub trait VideoSource: Send {
    /// Whether the next call to [`next_frame`](Self::next_frame) can deliver
    /// a picture with non-zero dimensions. Sources may use this call to
    /// (re)try opening the underlying device.
    fn is_ready(&mut self) -> bool;

    /// Returns the next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device or file. Calling this more than once is allowed.
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
