//! Re-encodes a resolved source into a stable local mp4 via ffmpeg.
//!
//! The export runs as a child process polled for completion so a cancel flag
//! or the deadline can kill it. Either way the partially written output is
//! removed before returning.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("ffmpeg not found on PATH; please install FFmpeg")]
    FfmpegMissing,
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ffmpeg exited with status {code:?}")]
    Failed { code: Option<i32> },
    #[error("export timed out after {0:?}")]
    TimedOut(Duration),
    #[error("export cancelled")]
    Cancelled,
}

/// Writes `dest` from `source`, re-encoding to H.264/AAC mp4 with faststart
/// so the file is immediately seekable. Blocks until the export reaches a
/// terminal state: done, failed, timed out, or cancelled via `cancel`.
pub fn export_to_mp4(
    source: &Path,
    dest: &Path,
    timeout: Duration,
    cancel: &AtomicBool,
) -> Result<(), ExportError> {
    let ffmpeg = which::which("ffmpeg").map_err(|_| ExportError::FfmpegMissing)?;

    let mut child = Command::new(ffmpeg)
        .arg("-y")
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(source)
        .arg("-c:v")
        .arg("libx264")
        .arg("-preset")
        .arg("medium")
        .arg("-crf")
        .arg("23")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-movflags")
        .arg("+faststart")
        .arg("-c:a")
        .arg("aac")
        .arg(dest)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                debug!(target: "media_io::export", dest = %dest.display(), "export complete");
                return Ok(());
            }
            remove_partial(dest);
            return Err(ExportError::Failed {
                code: status.code(),
            });
        }
        if cancel.load(Ordering::Relaxed) {
            kill_and_reap(&mut child);
            remove_partial(dest);
            return Err(ExportError::Cancelled);
        }
        if Instant::now() >= deadline {
            kill_and_reap(&mut child);
            remove_partial(dest);
            warn!(target: "media_io::export", dest = %dest.display(), ?timeout, "export timed out");
            return Err(ExportError::TimedOut(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut std::process::Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn remove_partial(dest: &Path) {
    if dest.exists() {
        if let Err(e) = std::fs::remove_file(dest) {
            warn!(target: "media_io::export", dest = %dest.display(), error = %e, "failed to remove partial output");
        }
    }
}
