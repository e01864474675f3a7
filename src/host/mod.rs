//! Host application collaborators.
//!
//! The job pipeline never touches the host's scene, renderer or timeline
//! directly; it goes through these traits. All of them are called from the
//! polling (interactive) context only.
//!
//! - [`FrameRenderer`]: renders endpoint frames, receives the final resolution
//! - [`TimelineProjection`]: the frame-indexed track generated images go into
//! - [`SceneObjects`]: visibility of generator-created objects
//! - [`StatusReporter`]: user-visible status messages
//!
//! [`ProjectHost`] bundles in-memory implementations with a JSON manifest
//! for standalone use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{EntryId, TimelineEntry};

pub mod files;
pub mod memory;
pub mod project;

pub use files::FileRenderer;
pub use memory::{MemoryScene, MemoryTimeline, SceneObject};
pub use project::{ProjectHost, Report};

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

impl ReportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLevel::Info => "info",
            ReportLevel::Warning => "warning",
            ReportLevel::Error => "error",
        }
    }
}

/// Renders timeline frames to encoded image buffers.
pub trait FrameRenderer {
    /// Moves the scene to `frame` and renders it to PNG bytes.
    fn render_frame(&mut self, frame: i32) -> Result<Vec<u8>>;

    /// Sets the render resolution used from now on.
    fn set_resolution(&mut self, width: u32, height: u32);
}

/// The host's ordered, frame-indexed track of visual elements.
pub trait TimelineProjection {
    /// Moves the playhead.
    fn set_current_frame(&mut self, frame: i32);

    /// Registers the image at `path` as a named asset.
    fn load_image(&mut self, name: &str, path: &Path) -> Result<()>;

    /// Places an image entry on `channel` starting at `start_frame`.
    fn insert_entry(
        &mut self,
        name: &str,
        path: &Path,
        channel: u32,
        start_frame: i32,
    ) -> Result<EntryId>;

    fn set_entry_duration(&mut self, id: EntryId, frames: u32) -> Result<()>;

    /// Forces the host to pick up pending changes.
    fn refresh(&mut self);

    /// Lists every entry on the timeline.
    fn entries(&self) -> Vec<TimelineEntry>;

    fn set_muted(&mut self, id: EntryId, muted: bool) -> Result<()>;
}

/// Named objects in the host scene.
pub trait SceneObjects {
    /// Unhides, selects and activates `name`. Returns false if it does not exist.
    fn reveal_object(&mut self, name: &str) -> bool;

    /// Frames the viewport on `name`.
    fn focus_viewport(&mut self, name: &str);
}

/// Sink for user-visible status messages.
pub trait StatusReporter {
    fn report(&mut self, level: ReportLevel, message: &str);
}

/// Everything the job supervisor needs from the host.
pub trait Host: FrameRenderer + TimelineProjection + SceneObjects + StatusReporter {}

impl<T> Host for T where T: FrameRenderer + TimelineProjection + SceneObjects + StatusReporter {}
