//! Bounded-concurrency import pipeline.
//!
//! Each picked source goes through resolve -> export -> sample and either
//! becomes a [`timeline::Clip`] or fails terminally; a batch is done only
//! once every item is terminal. The export stage is the gated resource.
//!
//! External collaborators are injected as traits so the pipeline can run
//! against ffmpeg in production and against fakes in tests; there is no
//! shared singleton manager.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use media_io::{ExportError, SampleError};
use timeline::Frame;

pub mod config;
pub use config::ImportConfig;
mod gate;
pub(crate) use gate::ExportGate;
mod worker;
mod coordinator;
pub use coordinator::{restore_clips, ImportCoordinator};
pub mod ffmpeg;

/// Opaque reference to an externally picked video, resolvable by a
/// [`MediaSource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&Path> for SourceRef {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// A playable handle for a resolved source. Duration here is advisory; the
/// authoritative duration is measured from the exported file.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub path: PathBuf,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub duration: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("source unreadable: {0}")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source not found: {0}")]
    NotFound(String),
    #[error("export failed: {0}")]
    ExportFailed(#[from] ExportError),
    #[error("duration unavailable for {}", .0.display())]
    DurationUnavailable(PathBuf),
}

pub trait MediaSource: Send + Sync {
    fn resolve(&self, source: &SourceRef) -> Result<ResolvedMedia, ResolveError>;
}

pub trait MediaExporter: Send + Sync {
    fn export(
        &self,
        media: &ResolvedMedia,
        dest: &Path,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<ExportedFile, ExportError>;
}

pub trait FrameSource: Send + Sync {
    fn sample(
        &self,
        path: &Path,
        duration: f64,
        interval: f64,
        max_size: (u32, u32),
    ) -> Result<Vec<Frame>, SampleError>;
}

/// The injected collaborator set for one pipeline.
#[derive(Clone)]
pub struct ImportDeps {
    pub source: Arc<dyn MediaSource>,
    pub exporter: Arc<dyn MediaExporter>,
    pub frames: Arc<dyn FrameSource>,
}

/// Cooperative cancellation for an in-flight batch. Workers check it between
/// stages and the exporter polls it mid-export.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn flag(&self) -> &AtomicBool {
        &self.0
    }
}
