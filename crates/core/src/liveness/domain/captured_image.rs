use crate::shared::constants::SELFIE_FILE_NAME;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureTrigger {
    /// Fired by the pipeline after the challenge passed.
    Automatic,
    /// Requested by the operator, regardless of challenge progress.
    Manual,
}

/// The single still image a liveness session emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub frame_index: usize,
    pub trigger: CaptureTrigger,
}

impl CapturedImage {
    pub fn file_name(&self) -> &'static str {
        SELFIE_FILE_NAME
    }
}
