use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::kyc::domain::submission::ImageUpload;
use crate::kyc::domain::upload_store::UploadStore;

/// Writes uploads into one directory as `<millis>-<seq>-<name>`.
pub struct FsUploadStore {
    dir: PathBuf,
    seq: u64,
}

impl FsUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl UploadStore for FsUploadStore {
    fn store(&mut self, upload: &ImageUpload) -> Result<PathBuf, Box<dyn std::error::Error>> {
        fs::create_dir_all(&self.dir)?;
        self.seq += 1;
        let name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            self.seq,
            sanitize_file_name(&upload.file_name)
        );
        let path = self.dir.join(name);
        fs::write(&path, &upload.bytes)?;
        log::debug!("Stored upload {} ({} bytes)", path.display(), upload.bytes.len());
        Ok(path)
    }

    fn remove(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Keeps only the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("pan.jpg", "pan.jpg")]
    #[case::spaces("my selfie.png", "my_selfie.png")]
    #[case::traversal("../../etc/passwd", "passwd")]
    #[case::windows_path("C:\\Users\\a\\doc.jpg", "doc.jpg")]
    #[case::empty("", "upload")]
    #[case::dots("..", "upload")]
    fn test_sanitize_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(input), expected);
    }

    #[test]
    fn test_store_writes_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsUploadStore::new(dir.path().join("uploads"));
        let upload = ImageUpload::new("doc.jpg", vec![1, 2, 3]);

        let a = store.store(&upload).unwrap();
        let b = store.store(&upload).unwrap();

        assert_ne!(a, b);
        assert_eq!(fs::read(&a).unwrap(), vec![1, 2, 3]);
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-1-doc.jpg"), "{name}");
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsUploadStore::new(dir.path());
        let path = store.store(&ImageUpload::new("a.png", vec![0])).unwrap();

        store.remove(&path).unwrap();
        assert!(!path.exists());
        assert!(store.remove(&path).is_err());
    }
}
