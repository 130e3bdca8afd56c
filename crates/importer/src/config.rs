use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use timeline::BASE_FRAME_INTERVAL;

/// Tunables for one import pipeline. Deserializes leniently: missing fields
/// fall back to defaults so a config file only has to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// How many exports may run at once. Everything above the export stage
    /// (resolving, sampling) is not gated.
    pub max_concurrent_exports: usize,
    /// A single export is killed after this many seconds.
    pub export_timeout_secs: u64,
    /// Where exported mp4 files land. `None` means the OS temp directory.
    pub scratch_dir: Option<PathBuf>,
    /// Seconds between preview frames at scale 1.0.
    pub base_frame_interval: f64,
    pub max_frame_width: u32,
    pub max_frame_height: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_concurrent_exports: 1,
            export_timeout_secs: 120,
            scratch_dir: None,
            base_frame_interval: BASE_FRAME_INTERVAL,
            max_frame_width: 300,
            max_frame_height: 200,
        }
    }
}

impl ImportConfig {
    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn max_frame_size(&self) -> (u32, u32) {
        (self.max_frame_width, self.max_frame_height)
    }
}
