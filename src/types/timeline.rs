//! TimelineEntry type representing one placed image on the timeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier assigned to an entry by the timeline that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One visual element on the timeline.
///
/// Entries created by the insertion pipeline are named `Inbetween_<frame>`,
/// last one frame, and point at the persisted `frame_<frame>.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: EntryId,
    pub name: String,
    /// Frame the entry starts at.
    pub frame_number: i32,
    pub source_path: PathBuf,
    pub duration_frames: u32,
    /// Track the entry sits on (1-based).
    pub channel: u32,
    pub muted: bool,
}

impl TimelineEntry {
    /// Returns true if the entry covers `frame`.
    pub fn covers(&self, frame: i32) -> bool {
        let start = i64::from(self.frame_number);
        let end = start + i64::from(self.duration_frames);
        (start..end).contains(&i64::from(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_respects_duration() {
        let entry = TimelineEntry {
            id: EntryId(1),
            name: "Inbetween_5".to_string(),
            frame_number: 5,
            source_path: PathBuf::from("frame_5.png"),
            duration_frames: 1,
            channel: 1,
            muted: false,
        };
        assert!(entry.covers(5));
        assert!(!entry.covers(4));
        assert!(!entry.covers(6));
    }

    #[test]
    fn covers_at_end_of_frame_range() {
        let entry = TimelineEntry {
            id: EntryId(2),
            name: "Inbetween_max".to_string(),
            frame_number: i32::MAX - 2,
            source_path: PathBuf::from("frame_max.png"),
            duration_frames: 25,
            channel: 1,
            muted: false,
        };
        assert!(entry.covers(i32::MAX));
        assert!(entry.covers(i32::MAX - 2));
        assert!(!entry.covers(i32::MIN));
    }
}
