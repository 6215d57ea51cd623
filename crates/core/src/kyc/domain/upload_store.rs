use std::path::{Path, PathBuf};

use super::submission::ImageUpload;

/// Where uploaded images are kept.
pub trait UploadStore: Send {
    /// Stores the bytes under a unique name and returns where they went.
    fn store(&mut self, upload: &ImageUpload) -> Result<PathBuf, Box<dyn std::error::Error>>;

    fn remove(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>>;
}
