//! In-memory timeline and scene.
//!
//! Both types are serde-serializable so a [`ProjectHost`] can persist them
//! between runs.
//!
//! [`ProjectHost`]: super::ProjectHost

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InbetweenError, Result};
use crate::types::{EntryId, TimelineEntry};

use super::{SceneObjects, TimelineProjection};

/// Length given to a freshly inserted still image, like the editor does.
pub const DEFAULT_STILL_DURATION: u32 = 25;

/// A timeline held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTimeline {
    entries: Vec<TimelineEntry>,
    images: BTreeMap<String, PathBuf>,
    next_id: u64,
    current_frame: i32,
    #[serde(skip)]
    refreshes: usize,
}

impl MemoryTimeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry with `id`, if any.
    pub fn entry(&self, id: EntryId) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the timeline has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns how many times the timeline was refreshed in this session.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    /// First channel at or above `channel` with nothing at `frame`.
    fn free_channel(&self, channel: u32, frame: i32) -> u32 {
        let mut channel = channel.max(1);
        while self
            .entries
            .iter()
            .any(|e| e.channel == channel && e.covers(frame))
        {
            channel += 1;
        }
        channel
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut TimelineEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| InbetweenError::timeline_insert_failed(format!("No timeline entry {}", id)))
    }
}

impl TimelineProjection for MemoryTimeline {
    fn set_current_frame(&mut self, frame: i32) {
        self.current_frame = frame;
    }

    fn load_image(&mut self, name: &str, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(InbetweenError::timeline_insert_failed(format!(
                "Cannot load image {}: {} does not exist",
                name,
                path.display()
            )));
        }
        self.images.insert(name.to_string(), path.to_path_buf());
        Ok(())
    }

    fn insert_entry(
        &mut self,
        name: &str,
        path: &Path,
        channel: u32,
        start_frame: i32,
    ) -> Result<EntryId> {
        if name.is_empty() {
            return Err(InbetweenError::timeline_insert_failed(
                "Timeline entries need a name",
            ));
        }
        if !path.is_file() {
            return Err(InbetweenError::timeline_insert_failed(format!(
                "Cannot place {}: {} does not exist",
                name,
                path.display()
            )));
        }

        let channel = self.free_channel(channel, start_frame);
        self.next_id += 1;
        let id = EntryId(self.next_id);
        self.entries.push(TimelineEntry {
            id,
            name: name.to_string(),
            frame_number: start_frame,
            source_path: path.to_path_buf(),
            duration_frames: DEFAULT_STILL_DURATION,
            channel,
            muted: false,
        });
        Ok(id)
    }

    fn set_entry_duration(&mut self, id: EntryId, frames: u32) -> Result<()> {
        if frames == 0 {
            return Err(InbetweenError::timeline_insert_failed(
                "Entry duration must be at least one frame",
            ));
        }
        self.entry_mut(id)?.duration_frames = frames;
        Ok(())
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.clone()
    }

    fn set_muted(&mut self, id: EntryId, muted: bool) -> Result<()> {
        self.entry_mut(id)?.muted = muted;
        Ok(())
    }
}

/// Visibility flags of one scene object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub hide_viewport: bool,
    pub hide_render: bool,
    pub hide_select: bool,
    pub selected: bool,
    /// Linked into the active collection.
    pub linked: bool,
}

/// A scene holding named objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryScene {
    objects: BTreeMap<String, SceneObject>,
    active: Option<String>,
    focused: Option<String>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an object.
    pub fn add_object(&mut self, name: impl Into<String>, object: SceneObject) {
        self.objects.insert(name.into(), object);
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name)
    }

    /// Name of the active object.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Name of the object the viewport was last framed on.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }
}

impl SceneObjects for MemoryScene {
    fn reveal_object(&mut self, name: &str) -> bool {
        let Some(object) = self.objects.get_mut(name) else {
            return false;
        };
        object.hide_viewport = false;
        object.hide_render = false;
        object.hide_select = false;
        object.linked = true;
        object.selected = true;
        self.active = Some(name.to_string());
        true
    }

    fn focus_viewport(&mut self, name: &str) {
        if self.objects.contains_key(name) {
            self.focused = Some(name.to_string());
        }
    }
}
