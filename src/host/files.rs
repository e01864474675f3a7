//! Frame renderer backed by pre-rendered images on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{InbetweenError, Result};

use super::FrameRenderer;

/// "Renders" a frame by reading `<frames_dir>/<NNNN>.png`.
///
/// This matches the default output naming of a host render-to-disk pass,
/// so a directory produced by the host can be used directly.
#[derive(Debug, Clone)]
pub struct FileRenderer {
    frames_dir: PathBuf,
    resolution: Option<(u32, u32)>,
}

impl FileRenderer {
    pub fn new(frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            resolution: None,
        }
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Path of the pre-rendered image for `frame`.
    pub fn frame_path(&self, frame: i32) -> PathBuf {
        self.frames_dir.join(format!("{:04}.png", frame))
    }

    /// Resolution requested by the last `set_resolution` call.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }
}

impl FrameRenderer for FileRenderer {
    fn render_frame(&mut self, frame: i32) -> Result<Vec<u8>> {
        let path = self.frame_path(frame);
        debug!(frame, path = %path.display(), "Reading pre-rendered frame");
        std::fs::read(&path)
            .map_err(|e| InbetweenError::render_failed(frame, format!("{}: {}", path.display(), e)))
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = Some((width, height));
    }
}
