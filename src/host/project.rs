//! Standalone host backed by a JSON manifest.
//!
//! `ProjectHost` combines a [`FrameRenderer`] with an in-memory timeline and
//! scene. The timeline and scene are loaded from and saved to a manifest file
//! so repeated runs accumulate entries like a real project would.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::types::{EntryId, TimelineEntry};

use super::{
    FileRenderer, FrameRenderer, MemoryScene, MemoryTimeline, ReportLevel, SceneObjects,
    StatusReporter, TimelineProjection,
};

/// A buffered status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    resolution: Option<(u32, u32)>,
    #[serde(default)]
    timeline: MemoryTimeline,
    #[serde(default)]
    scene: MemoryScene,
}

pub struct ProjectHost<R = FileRenderer> {
    renderer: R,
    pub timeline: MemoryTimeline,
    pub scene: MemoryScene,
    resolution: Option<(u32, u32)>,
    reports: Vec<Report>,
    manifest_path: Option<PathBuf>,
}

impl<R: FrameRenderer> ProjectHost<R> {
    /// Creates a host with an empty timeline and no manifest.
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            timeline: MemoryTimeline::new(),
            scene: MemoryScene::new(),
            resolution: None,
            reports: Vec::new(),
            manifest_path: None,
        }
    }

    /// Opens the project stored at `manifest_path`.
    ///
    /// A missing manifest starts an empty project that `save` will create.
    pub fn open(renderer: R, manifest_path: impl Into<PathBuf>) -> io::Result<Self> {
        let manifest_path = manifest_path.into();
        let manifest = if manifest_path.exists() {
            let contents = std::fs::read_to_string(&manifest_path)?;
            serde_json::from_str::<Manifest>(&contents)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        } else {
            debug!(path = %manifest_path.display(), "No project manifest yet, starting empty");
            Manifest::default()
        };

        let mut host = Self::new(renderer);
        host.timeline = manifest.timeline;
        host.scene = manifest.scene;
        if let Some((width, height)) = manifest.resolution {
            host.set_resolution(width, height);
        }
        host.manifest_path = Some(manifest_path);
        Ok(host)
    }

    /// Writes the timeline and scene back to the manifest, if one was opened.
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.manifest_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let manifest = ManifestRef {
            resolution: self.resolution,
            timeline: &self.timeline,
            scene: &self.scene,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), entries = self.timeline.len(), "Project manifest saved");
        Ok(())
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Render resolution last set by a finished job.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Takes every status message reported since the last drain.
    pub fn drain_reports(&mut self) -> Vec<Report> {
        std::mem::take(&mut self.reports)
    }
}

#[derive(Serialize)]
struct ManifestRef<'a> {
    resolution: Option<(u32, u32)>,
    timeline: &'a MemoryTimeline,
    scene: &'a MemoryScene,
}

impl<R: FrameRenderer> FrameRenderer for ProjectHost<R> {
    fn render_frame(&mut self, frame: i32) -> Result<Vec<u8>> {
        self.timeline.set_current_frame(frame);
        self.renderer.render_frame(frame)
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = Some((width, height));
        self.renderer.set_resolution(width, height);
    }
}

impl<R> TimelineProjection for ProjectHost<R> {
    fn set_current_frame(&mut self, frame: i32) {
        self.timeline.set_current_frame(frame);
    }

    fn load_image(&mut self, name: &str, path: &Path) -> Result<()> {
        self.timeline.load_image(name, path)
    }

    fn insert_entry(
        &mut self,
        name: &str,
        path: &Path,
        channel: u32,
        start_frame: i32,
    ) -> Result<EntryId> {
        self.timeline.insert_entry(name, path, channel, start_frame)
    }

    fn set_entry_duration(&mut self, id: EntryId, frames: u32) -> Result<()> {
        self.timeline.set_entry_duration(id, frames)
    }

    fn refresh(&mut self) {
        self.timeline.refresh();
    }

    fn entries(&self) -> Vec<TimelineEntry> {
        self.timeline.entries()
    }

    fn set_muted(&mut self, id: EntryId, muted: bool) -> Result<()> {
        self.timeline.set_muted(id, muted)
    }
}

impl<R> SceneObjects for ProjectHost<R> {
    fn reveal_object(&mut self, name: &str) -> bool {
        self.scene.reveal_object(name)
    }

    fn focus_viewport(&mut self, name: &str) {
        self.scene.focus_viewport(name);
    }
}

impl<R> StatusReporter for ProjectHost<R> {
    fn report(&mut self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => info!("{}", message),
            ReportLevel::Warning => warn!("{}", message),
            ReportLevel::Error => error!("{}", message),
        }
        self.reports.push(Report {
            level,
            message: message.to_string(),
        });
    }
}
