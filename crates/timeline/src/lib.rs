use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod scrub;
pub use scrub::*;
mod zoom;
pub use zoom::*;

/// Seconds of media represented by one unscaled timeline unit.
pub const UNIT_SECONDS: f64 = 30.0;
/// Pixel width of one unscaled timeline unit.
pub const UNIT_WIDTH: f64 = 100.0;
/// Width of the trailing placeholder slot at scale 1.0. It reserves scroll
/// headroom and a drop target past the last real clip.
pub const EMPTY_CELL_WIDTH: f64 = 1000.0;
/// Preview sampling interval at scale 1.0, in seconds.
pub const BASE_FRAME_INTERVAL: f64 = 1.0;

pub const SCALE_MIN: f64 = 0.5;
pub const SCALE_MAX: f64 = 3.0;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("clip index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Deletes local files on behalf of the timeline. Deleting an absent path is
/// a no-op, never an error.
pub trait FileStore {
    fn delete(&self, path: &Path);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One decoded still image sampled from a clip. RGBA8, row-major. A frame has
/// no identity beyond its position in the clip's sequence; frame `i` sits at
/// `frame_interval * i` within the clip.
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            pixels: Arc::from(pixels.into_boxed_slice()),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// One imported, locally stored video: a stable file on disk, its measured
/// duration, and the preview frames sampled from it.
#[derive(Debug, Clone)]
pub struct Clip {
    id: ClipId,
    source_path: PathBuf,
    duration: f64,
    frames: Vec<Frame>,
    persisted: bool,
}

impl Clip {
    pub fn new(source_path: PathBuf, duration: f64) -> Self {
        Self {
            id: ClipId::new(),
            source_path,
            duration: duration.max(0.0),
            frames: Vec::new(),
            persisted: false,
        }
    }

    /// A clip rebuilt from durable storage. Its backing file is owned by the
    /// store, so it starts out persisted.
    pub fn restored(source_path: PathBuf, duration: f64) -> Self {
        let mut clip = Self::new(source_path, duration);
        clip.persisted = true;
        clip
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Duration in seconds. Immutable once set.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn mark_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }
}

/// The ordered clip sequence plus the current zoom scale. Order is the sole
/// source of truth for concatenated duration and flattened frame order.
///
/// The timeline has a single owner; results produced on import threads are
/// handed to that owner before any mutation here.
#[derive(Debug)]
pub struct Timeline {
    clips: Vec<Clip>,
    scale: f64,
    pending_resample: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            clips: Vec::new(),
            scale: 1.0,
            pending_resample: false,
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Appends clips in the order given (completion order for an import
    /// batch, not submission order).
    pub fn append(&mut self, clips: impl IntoIterator<Item = Clip>) {
        self.clips.extend(clips);
    }

    /// Removes one clip and hands it back to the caller, who decides whether
    /// its backing file should go with it.
    pub fn remove(&mut self, id: ClipId) -> Option<Clip> {
        let idx = self.clips.iter().position(|c| c.id() == id)?;
        Some(self.clips.remove(idx))
    }

    /// Clears the timeline. Backing files of non-persisted clips are deleted;
    /// persisted clips' files survive.
    pub fn remove_all(&mut self, store: &dyn FileStore) {
        for clip in self.clips.drain(..) {
            if !clip.is_persisted() {
                store.delete(clip.source_path());
            }
        }
    }

    /// Stable move: delete then insert at the destination index. All other
    /// relative orderings are preserved.
    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<(), TimelineError> {
        let len = self.clips.len();
        if from >= len {
            return Err(TimelineError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(TimelineError::IndexOutOfRange { index: to, len });
        }
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        Ok(())
    }

    /// Clamps to [SCALE_MIN, SCALE_MAX]. Changing scale invalidates derived
    /// widths and marks a pending re-sample; it never re-samples frames
    /// itself. See [`ScaleDebounce`] for when to re-sample.
    pub fn set_scale(&mut self, scale: f64) {
        let clamped = scale.clamp(SCALE_MIN, SCALE_MAX);
        if (clamped - self.scale).abs() > f64::EPSILON {
            self.scale = clamped;
            self.pending_resample = true;
        }
    }

    /// True once after a scale change; re-sampling at the new density clears
    /// it.
    pub fn take_pending_resample(&mut self) -> bool {
        std::mem::take(&mut self.pending_resample)
    }

    /// Sampling interval implied by the current scale: denser at higher zoom.
    ///
    /// [`resolve`](crate::resolve) maps offsets to indices assuming frames
    /// spaced `BASE_FRAME_INTERVAL` apart. A caller that re-samples at this
    /// denser interval holds `scale` times as many frames per clip and must
    /// multiply resolved indices by the same scale.
    pub fn frame_interval(&self) -> f64 {
        BASE_FRAME_INTERVAL / self.scale
    }

    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(Clip::duration).sum()
    }

    pub fn flattened_frames(&self) -> impl Iterator<Item = &Frame> {
        self.clips.iter().flat_map(|c| c.frames().iter())
    }

    pub fn flattened_len(&self) -> usize {
        self.clips.iter().map(|c| c.frames().len()).sum()
    }

    pub fn frame_at(&self, flat_index: usize) -> Option<&Frame> {
        let mut idx = flat_index;
        for clip in &self.clips {
            let n = clip.frames().len();
            if idx < n {
                return clip.frames().get(idx);
            }
            idx -= n;
        }
        None
    }

    pub fn display_width(&self, clip: &Clip) -> f64 {
        clip.duration() / UNIT_SECONDS * UNIT_WIDTH * self.scale
    }

    pub fn placeholder_width(&self) -> f64 {
        EMPTY_CELL_WIDTH * self.scale
    }

    /// Scrollable width of the real clips, placeholder excluded. Elapsed time
    /// reaches the total exactly at this offset.
    pub fn content_width(&self) -> f64 {
        self.clips.iter().map(|c| self.display_width(c)).sum()
    }
}
