//! Scroll-offset to (frame, elapsed time) resolution.
//!
//! Pure arithmetic over the current timeline state. Idempotent, no I/O,
//! never blocks; safe to call on every scroll event.

use crate::{Timeline, UNIT_SECONDS, UNIT_WIDTH};

/// Result of resolving one scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubPoint {
    /// Index into the flattened frame sequence, `None` when the offset maps
    /// past the available frames. The renderer keeps the last valid frame
    /// (or blank) in that case.
    pub frame_index: Option<usize>,
    /// Elapsed seconds, in `[0, total]`.
    pub elapsed: f64,
    pub total: f64,
}

/// Maps a horizontal scroll offset (px) onto the concatenated timeline.
///
/// Elapsed time is proportional to the content width with the trailing
/// placeholder excluded, so it reaches `total` exactly at the boundary
/// between the last real clip and the placeholder.
///
/// The frame index assumes frames spaced `BASE_FRAME_INTERVAL` apart; see
/// [`Timeline::frame_interval`] for the adjustment when frames were sampled
/// at a scaled interval.
pub fn resolve(scroll_offset: f64, timeline: &Timeline) -> ScrubPoint {
    let total = timeline.total_duration();
    let content_width = timeline.content_width();
    let offset = scroll_offset.max(0.0);

    let elapsed = if content_width > 0.0 {
        (total * offset / content_width).clamp(0.0, total)
    } else {
        0.0
    };

    let raw_index = (offset * UNIT_SECONDS / (UNIT_WIDTH * timeline.scale())).floor();
    let frame_index = if raw_index.is_finite() && raw_index >= 0.0 {
        let idx = raw_index as usize;
        (idx < timeline.flattened_len()).then_some(idx)
    } else {
        None
    };

    ScrubPoint {
        frame_index,
        elapsed,
        total,
    }
}

/// `"MM:SS.ss / MM:SS.ss"` readout for the scrub overlay. Elapsed is clamped
/// to the total.
pub fn format_progress(elapsed: f64, total: f64) -> String {
    format!(
        "{} / {}",
        format_time(elapsed.min(total)),
        format_time(total)
    )
}

fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds as u64) / 60;
    format!("{:02}:{:05.2}", minutes, seconds % 60.0)
}
