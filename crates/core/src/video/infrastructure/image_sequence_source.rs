use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::video_source::VideoSource;

/// Plays the image files of a directory as a video, in file name order.
///
/// The directory is scanned when readiness is first checked, so a capture
/// tool may still be writing frames when the session starts. An optional
/// pacing interval spaces frames out like a camera would.
pub struct ImageSequenceSource {
    dir: PathBuf,
    pending: Option<VecDeque<PathBuf>>,
    frame_interval: Option<Duration>,
    last_delivered: Option<Instant>,
    next_index: usize,
    stopped: bool,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            pending: None,
            frame_interval: None,
            last_delivered: None,
            next_index: 0,
            stopped: false,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    fn scan(&self) -> std::io::Result<VecDeque<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();
        Ok(files.into())
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_delivered) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last_delivered = Some(Instant::now());
    }
}

impl VideoSource for ImageSequenceSource {
    fn is_ready(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        if self.pending.is_none() {
            match self.scan() {
                Ok(files) if !files.is_empty() => self.pending = Some(files),
                Ok(_) => return false,
                Err(e) => {
                    log::debug!("Frame directory {} not readable: {e}", self.dir.display());
                    return false;
                }
            }
        }
        let Some(first) = self.pending.as_ref().and_then(|p| p.front()) else {
            return false;
        };
        match image::image_dimensions(first) {
            Ok((w, h)) => w > 0 && h > 0,
            Err(e) => {
                log::debug!("First frame {} not decodable yet: {e}", first.display());
                false
            }
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.stopped {
            return Ok(None);
        }
        let Some(path) = self.pending.as_mut().and_then(|p| p.pop_front()) else {
            return Ok(None);
        };

        let img = image::open(&path)
            .map_err(|e| format!("Failed to decode frame {}: {e}", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();

        self.pace();
        let frame = Frame::new(img.into_raw(), width, height, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.stopped = true;
        self.pending = None;
        Ok(())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
