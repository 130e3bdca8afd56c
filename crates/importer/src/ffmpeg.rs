//! Production adapters binding the pipeline traits to the ffmpeg tooling in
//! `media-io`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use media_io::{ExportError, SampleError};
use timeline::Frame;

use crate::{
    CancelToken, ExportedFile, FrameSource, ImportDeps, MediaExporter, MediaSource, ResolveError,
    ResolvedMedia, SourceRef,
};

/// Treats a source reference as a filesystem path and probes it.
pub struct FsSource;

impl MediaSource for FsSource {
    fn resolve(&self, source: &SourceRef) -> Result<ResolvedMedia, ResolveError> {
        let path = PathBuf::from(source.as_str());
        if !path.is_file() {
            return Err(ResolveError::NotFound(source.as_str().to_owned()));
        }
        let duration = match media_io::probe_media(&path) {
            Ok(info) => info.duration_seconds,
            Err(err) => return Err(ResolveError::Unreadable(err.to_string())),
        };
        Ok(ResolvedMedia { path, duration })
    }
}

/// Re-encodes to a local mp4 and probes the result for the authoritative
/// duration.
pub struct FfmpegExporter;

impl MediaExporter for FfmpegExporter {
    fn export(
        &self,
        media: &ResolvedMedia,
        dest: &Path,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<ExportedFile, ExportError> {
        media_io::export_to_mp4(&media.path, dest, timeout, cancel.flag())?;
        let duration = media_io::probe_media(dest)
            .ok()
            .and_then(|info| info.duration_seconds);
        Ok(ExportedFile {
            path: dest.to_path_buf(),
            duration,
        })
    }
}

pub struct FfmpegFrames;

impl FrameSource for FfmpegFrames {
    fn sample(
        &self,
        path: &Path,
        duration: f64,
        interval: f64,
        max_size: (u32, u32),
    ) -> Result<Vec<Frame>, SampleError> {
        media_io::sample(path, duration, interval, max_size)
    }
}

/// The default production wiring.
pub fn ffmpeg_deps() -> ImportDeps {
    ImportDeps {
        source: Arc::new(FsSource),
        exporter: Arc::new(FfmpegExporter),
        frames: Arc::new(FfmpegFrames),
    }
}
