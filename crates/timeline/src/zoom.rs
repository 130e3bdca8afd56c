//! Debounce for re-sampling after zoom changes.
//!
//! Changing the scale marks the timeline's frames stale but never re-samples
//! inline; re-sampling mid-pinch would thrash the decoder. The debounce fires
//! once, after the scale has been quiet for the configured window.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ScaleDebounce {
    quiet: Duration,
    last_touch: Option<Instant>,
}

impl ScaleDebounce {
    pub const DEFAULT_QUIET: Duration = Duration::from_millis(400);

    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_touch: None,
        }
    }

    /// Record a scale change at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }

    /// True once the quiet window has elapsed since the last touch; consumes
    /// the pending state so the caller re-samples exactly once per burst.
    pub fn take_ready(&mut self, now: Instant) -> bool {
        match self.last_touch {
            Some(t) if now.duration_since(t) >= self.quiet => {
                self.last_touch = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ScaleDebounce {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUIET)
    }
}
