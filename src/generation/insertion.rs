//! Timeline insertion of generated frames.
//!
//! Runs on the polling context. Frames are decoded, written to the job's
//! output directory and placed on the timeline one at a time; the first
//! failing frame stops the loop. Finalization (unmute everything, refresh)
//! always runs afterwards.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{InbetweenError, Result};
use crate::host::{ReportLevel, SceneObjects, StatusReporter, TimelineProjection};
use crate::types::{EntryId, FrameAsset, ImageFormat};

use super::CancelToken;

/// Timeline channel generated frames are placed on.
pub const INSERT_CHANNEL: u32 = 1;

/// Scene object revealed after a successful job.
pub const VISIBILITY_TARGET: &str = "InbetweenAnimation";

pub fn frame_file_name(frame_number: i32) -> String {
    format!("frame_{}.png", frame_number)
}

pub fn asset_name(frame_number: i32) -> String {
    format!("Inbetween_{}", frame_number)
}

/// A frame that made it onto the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedFrame {
    pub index: usize,
    pub frame_number: i32,
    pub path: PathBuf,
    pub entry: EntryId,
    /// Container sniffed from the decoded bytes; the file is always named `.png`.
    pub format: ImageFormat,
}

/// The frame that stopped insertion.
#[derive(Debug)]
pub struct FrameFailure {
    pub index: usize,
    pub frame_number: i32,
    pub error: InbetweenError,
}

/// What `apply_frames` did.
#[derive(Debug, Default)]
pub struct InsertionReport {
    pub requested: usize,
    pub inserted: Vec<InsertedFrame>,
    pub failure: Option<FrameFailure>,
    /// Index of the first frame skipped because the job was cancelled.
    pub cancelled_at: Option<usize>,
    /// Entries that were muted before finalization.
    pub unmuted: usize,
    pub finalize_errors: Vec<InbetweenError>,
}

impl InsertionReport {
    /// True when every requested frame was inserted.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.cancelled_at.is_none() && self.inserted.len() == self.requested
    }
}

/// Writes `frames` to `output_dir` and inserts them at consecutive frame
/// numbers starting from `start_frame`.
pub fn apply_frames<T>(
    frames: &[FrameAsset],
    start_frame: i32,
    output_dir: &Path,
    host: &mut T,
    cancel: &CancelToken,
) -> InsertionReport
where
    T: TimelineProjection + StatusReporter + ?Sized,
{
    let total = frames.len();
    let mut report = InsertionReport {
        requested: total,
        ..InsertionReport::default()
    };
    host.report(ReportLevel::Info, &format!("Starting to insert {} frames", total));

    for (index, frame) in frames.iter().enumerate() {
        if cancel.is_cancelled() {
            host.report(
                ReportLevel::Warning,
                &format!("Insertion cancelled before frame {} of {}", index + 1, total),
            );
            report.cancelled_at = Some(index);
            break;
        }

        host.report(
            ReportLevel::Info,
            &format!("Inserting frame {} of {}", index + 1, total),
        );

        let placed = frame_number_at(start_frame, index)
            .ok_or_else(|| {
                InbetweenError::timeline_insert_failed(format!(
                    "frame {} lies past the end of the timeline",
                    index + 1
                ))
            })
            .and_then(|frame_number| {
                insert_frame(frame, frame_number, output_dir, host)
                    .map(|placed| (frame_number, placed))
            });
        match placed {
            Ok((frame_number, (path, entry, format))) => {
                host.report(
                    ReportLevel::Info,
                    &format!("Successfully inserted frame {}", index + 1),
                );
                report.inserted.push(InsertedFrame {
                    index,
                    frame_number,
                    path,
                    entry,
                    format,
                });
            }
            Err(error) => {
                host.report(
                    ReportLevel::Error,
                    &format!("Error inserting frame {}: {}", index + 1, error.message),
                );
                report.failure = Some(FrameFailure {
                    index,
                    frame_number: frame_number_at(start_frame, index).unwrap_or(i32::MAX),
                    error,
                });
                break;
            }
        }
    }

    finalize(host, &mut report);
    report
}

/// Timeline frame of the `index`-th generated frame, if it fits in an `i32`.
fn frame_number_at(start_frame: i32, index: usize) -> Option<i32> {
    i32::try_from(index)
        .ok()
        .and_then(|offset| start_frame.checked_add(offset))
}

fn insert_frame<T>(
    frame: &FrameAsset,
    frame_number: i32,
    output_dir: &Path,
    host: &mut T,
) -> Result<(PathBuf, EntryId, ImageFormat)>
where
    T: TimelineProjection + ?Sized,
{
    host.set_current_frame(frame_number);

    let bytes = frame.decode()?;
    let format = ImageFormat::detect(&bytes);
    if format != ImageFormat::Png {
        warn!(frame_number, format = format.as_str(), "Generated frame is not PNG");
    }

    let path = output_dir.join(frame_file_name(frame_number));
    std::fs::write(&path, &bytes).map_err(|e| InbetweenError::persist_failed(&path, e))?;

    let name = asset_name(frame_number);
    host.load_image(&name, &path)?;
    let entry = host.insert_entry(&name, &path, INSERT_CHANNEL, frame_number)?;
    host.set_entry_duration(entry, 1)?;
    host.refresh();

    debug!(frame_number, entry = %entry, path = %path.display(), "Frame placed on timeline");
    Ok((path, entry, format))
}

fn finalize<T>(host: &mut T, report: &mut InsertionReport)
where
    T: TimelineProjection + StatusReporter + ?Sized,
{
    for entry in host.entries() {
        match host.set_muted(entry.id, false) {
            Ok(()) if entry.muted => report.unmuted += 1,
            Ok(()) => {}
            Err(e) => {
                warn!(entry = %entry.id, error = %e.message, "Failed to unmute timeline entry");
                report.finalize_errors.push(e);
            }
        }
    }
    host.refresh();
    host.report(
        ReportLevel::Info,
        "Finished inserting frames and updating view layer",
    );
}

/// Reveals and frames the generator-created object, if the scene has it.
pub fn ensure_visibility<S>(scene: &mut S, name: &str) -> bool
where
    S: SceneObjects + ?Sized,
{
    if !scene.reveal_object(name) {
        debug!(object = name, "Nothing to reveal");
        return false;
    }
    scene.focus_viewport(name);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::host::{MemoryScene, MemoryTimeline, SceneObject};
    use crate::types::TimelineEntry;
    use tempfile::tempdir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn png(marker: u8) -> FrameAsset {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.push(marker);
        FrameAsset::from_image_bytes(&bytes)
    }

    #[derive(Default)]
    struct RecordingHost {
        timeline: MemoryTimeline,
        reports: Vec<(ReportLevel, String)>,
        reject_frame: Option<i32>,
    }

    impl TimelineProjection for RecordingHost {
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
            if self.reject_frame == Some(start_frame) {
                return Err(InbetweenError::timeline_insert_failed("channel locked"));
            }
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

    impl StatusReporter for RecordingHost {
        fn report(&mut self, level: ReportLevel, message: &str) {
            self.reports.push((level, message.to_string()));
        }
    }

    #[test]
    fn frames_land_at_consecutive_numbers() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();
        let frames = vec![png(1), png(2), png(3)];

        let report = apply_frames(&frames, 5, dir.path(), &mut host, &CancelToken::new());

        assert!(report.is_complete());
        for (i, n) in [5, 6, 7].iter().enumerate() {
            let path = dir.path().join(format!("frame_{}.png", n));
            assert_eq!(std::fs::read(&path).unwrap(), frames[i].decode().unwrap());
            assert_eq!(report.inserted[i].frame_number, *n);
        }

        let entries = host.entries();
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            assert_eq!(entry.duration_frames, 1);
            assert_eq!(entry.channel, INSERT_CHANNEL);
            assert_eq!(entry.name, asset_name(entry.frame_number));
        }
        assert_eq!(host.reports[0].1, "Starting to insert 3 frames");
        assert!(host
            .reports
            .iter()
            .any(|(_, m)| m == "Inserting frame 2 of 3"));
    }

    #[test]
    fn decode_failure_stops_at_that_frame() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();
        let frames = vec![png(1), FrameAsset::from_encoded("!!not base64!!"), png(3)];

        let report = apply_frames(&frames, 1, dir.path(), &mut host, &CancelToken::new());

        assert!(!report.is_complete());
        assert_eq!(report.inserted.len(), 1);
        let failure = report.failure.unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.frame_number, 2);
        assert_eq!(failure.error.code, ErrorCode::DecodeFailed);
        assert!(!dir.path().join("frame_3.png").exists());
        assert!(host
            .reports
            .iter()
            .any(|(level, m)| *level == ReportLevel::Error && m.starts_with("Error inserting frame 2")));
    }

    #[test]
    fn finalization_runs_after_failure() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("old.png");
        std::fs::write(&existing, PNG_MAGIC).unwrap();

        let mut host = RecordingHost {
            reject_frame: Some(11),
            ..RecordingHost::default()
        };
        let old = host.timeline.insert_entry("old", &existing, 3, 40).unwrap();
        host.timeline.set_muted(old, true).unwrap();

        let frames = vec![png(1), png(2), png(3)];
        let report = apply_frames(&frames, 10, dir.path(), &mut host, &CancelToken::new());

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.failure.as_ref().unwrap().error.code, ErrorCode::TimelineInsertFailed);
        assert_eq!(report.unmuted, 1);
        assert!(host.entries().iter().all(|e| !e.muted));
        assert_eq!(
            host.reports.last().unwrap().1,
            "Finished inserting frames and updating view layer"
        );
    }

    #[test]
    fn frame_numbers_past_i32_max_fail_instead_of_wrapping() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();

        let frames = [png(1), png(2)];
        let report = apply_frames(&frames, i32::MAX, dir.path(), &mut host, &CancelToken::new());

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].frame_number, i32::MAX);
        let failure = report.failure.unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.error.code, ErrorCode::TimelineInsertFailed);
        assert_eq!(host.entries().len(), 1);
        assert!(!dir.path().join(frame_file_name(i32::MIN)).exists());
    }

    #[test]
    fn unwritable_output_dir_fails_first_frame_and_finalizes() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();
        let existing = dir.path().join("old.png");
        std::fs::write(&existing, PNG_MAGIC).unwrap();

        let mut host = RecordingHost::default();
        let old = host.timeline.insert_entry("old", &existing, 2, 1).unwrap();
        host.timeline.set_muted(old, true).unwrap();
        let refreshes_before = host.timeline.refresh_count();

        let frames = [png(1), png(2)];
        let report = apply_frames(&frames, 1, &blocker, &mut host, &CancelToken::new());

        let failure = report.failure.unwrap();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.error.code, ErrorCode::PersistFailed);
        assert!(report.inserted.is_empty());
        assert_eq!(host.entries().len(), 1);
        assert_eq!(report.unmuted, 1);
        assert!(host.entries().iter().all(|e| !e.muted));
        assert_eq!(host.timeline.refresh_count(), refreshes_before + 1);
        assert_eq!(
            host.reports.last().unwrap().1,
            "Finished inserting frames and updating view layer"
        );
    }

    #[test]
    fn inserted_frames_record_sniffed_format() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();
        let jpeg = FrameAsset::from_image_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0]);

        let frames = [png(1), jpeg];
        let report = apply_frames(&frames, 1, dir.path(), &mut host, &CancelToken::new());

        assert!(report.is_complete());
        assert_eq!(report.inserted[0].format, ImageFormat::Png);
        assert_eq!(report.inserted[1].format, ImageFormat::Jpeg);
    }

    #[test]
    fn cancellation_skips_remaining_frames() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = apply_frames(&[png(1), png(2)], 1, dir.path(), &mut host, &cancel);

        assert_eq!(report.cancelled_at, Some(0));
        assert!(report.inserted.is_empty());
        assert!(host.entries().is_empty());
        assert!(host.timeline.refresh_count() >= 1);
    }

    #[test]
    fn empty_batch_still_finalizes() {
        let dir = tempdir().unwrap();
        let mut host = RecordingHost::default();

        let report = apply_frames(&[], 1, dir.path(), &mut host, &CancelToken::new());

        assert!(report.is_complete());
        assert_eq!(host.timeline.refresh_count(), 1);
    }

    #[test]
    fn visibility_only_for_existing_object() {
        let mut scene = MemoryScene::new();
        assert!(!ensure_visibility(&mut scene, VISIBILITY_TARGET));

        scene.add_object(VISIBILITY_TARGET, SceneObject::default());
        assert!(ensure_visibility(&mut scene, VISIBILITY_TARGET));
        assert_eq!(scene.focused(), Some(VISIBILITY_TARGET));
    }
}
