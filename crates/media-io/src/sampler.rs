//! Uniform-interval preview frame sampling.
//!
//! Walks time from 0 through the clip duration (inclusive of the final
//! boundary step) and rips one downscaled frame per step with ffmpeg. A step
//! that fails to decode is logged and skipped; partial results are expected,
//! especially near clip boundaries. Only an unusable input is terminal.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::warn;

use timeline::Frame;

/// Seek window around each requested time: the decoder may return the
/// nearest frame up to this many seconds before the target.
pub const SAMPLE_TOLERANCE: f64 = 0.1;

const BOUNDARY_EPS: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("ffmpeg not found on PATH; please install FFmpeg")]
    FfmpegMissing,
    #[error("cannot open media at {0}")]
    Open(PathBuf),
    #[error("sample interval must be positive, got {0}")]
    BadInterval(f64),
    #[error("frame decode failed: {0}")]
    Decode(String),
    #[error("sampler io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Number of sample steps for a duration/interval pair: steps at
/// `0, interval, 2*interval, ...` while `t <= duration`.
pub fn sample_steps(duration: f64, interval: f64) -> usize {
    if duration < 0.0 || interval <= 0.0 {
        return 0;
    }
    ((duration + BOUNDARY_EPS) / interval) as usize + 1
}

/// Samples `path` at `interval` seconds apart, downscaling each frame to fit
/// within `max_size` (width, height) with aspect preserved.
pub fn sample(
    path: &Path,
    duration: f64,
    interval: f64,
    max_size: (u32, u32),
) -> Result<Vec<Frame>, SampleError> {
    if interval <= 0.0 {
        return Err(SampleError::BadInterval(interval));
    }
    let ffmpeg = which::which("ffmpeg").map_err(|_| SampleError::FfmpegMissing)?;
    if !path.exists() {
        return Err(SampleError::Open(path.to_path_buf()));
    }
    sample_with(path, duration, interval, |t| {
        grab_frame(&ffmpeg, path, t, max_size)
    })
}

/// Interval walk with the per-step fetch injected. A failed step is logged
/// and skipped; the surviving frames are returned in step order.
fn sample_with(
    path: &Path,
    duration: f64,
    interval: f64,
    mut step_fn: impl FnMut(f64) -> Result<Frame, SampleError>,
) -> Result<Vec<Frame>, SampleError> {
    let steps = sample_steps(duration, interval);
    let mut frames = Vec::with_capacity(steps);
    for step in 0..steps {
        let t = step as f64 * interval;
        match step_fn(t) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                warn!(target: "media_io::sampler", path = %path.display(), time = t, error = %e, "frame decode failed; skipping step");
            }
        }
    }
    Ok(frames)
}

fn grab_frame(
    ffmpeg: &Path,
    path: &Path,
    time: f64,
    max_size: (u32, u32),
) -> Result<Frame, SampleError> {
    let (max_w, max_h) = max_size;
    let seek = (time - SAMPLE_TOLERANCE).max(0.0);
    let out = Command::new(ffmpeg)
        .arg("-v")
        .arg("error")
        .arg("-ss")
        .arg(format!("{seek:.3}"))
        .arg("-i")
        .arg(path)
        .arg("-frames:v")
        .arg("1")
        .arg("-vf")
        .arg(format!(
            "scale=w={max_w}:h={max_h}:force_original_aspect_ratio=decrease"
        ))
        .arg("-f")
        .arg("image2pipe")
        .arg("-vcodec")
        .arg("png")
        .arg("-")
        .output()?;

    if !out.status.success() || out.stdout.is_empty() {
        return Err(SampleError::Decode(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }

    let img = image::load_from_memory(&out.stdout)
        .map_err(|e| SampleError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(width, height, img.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_seconds_at_one_second_interval_is_six_steps() {
        assert_eq!(sample_steps(5.0, 1.0), 6);
    }

    #[test]
    fn boundary_step_is_inclusive() {
        // 2.0 / 0.5 -> 0.0, 0.5, 1.0, 1.5, 2.0
        assert_eq!(sample_steps(2.0, 0.5), 5);
        // Just short of the boundary drops the final step.
        assert_eq!(sample_steps(1.999, 0.5), 4);
    }

    #[test]
    fn zero_duration_still_samples_the_first_frame() {
        assert_eq!(sample_steps(0.0, 1.0), 1);
    }

    #[test]
    fn degenerate_inputs_produce_no_steps() {
        assert_eq!(sample_steps(-1.0, 1.0), 0);
        assert_eq!(sample_steps(5.0, 0.0), 0);
    }

    #[test]
    fn failed_step_is_skipped_and_the_rest_survive() {
        let frames = sample_with(Path::new("/tmp/a.mp4"), 5.0, 1.0, |t| {
            if t == 3.0 {
                Err(SampleError::Decode("corrupt keyframe".into()))
            } else {
                Ok(Frame::new(1, 1, vec![0, 0, 0, 255]))
            }
        })
        .unwrap();
        assert_eq!(frames.len(), 5);
    }

    #[test]
    fn steps_are_fetched_in_order() {
        let mut seen = Vec::new();
        sample_with(Path::new("/tmp/a.mp4"), 2.0, 0.5, |t| {
            seen.push(t);
            Ok(Frame::new(1, 1, vec![0, 0, 0, 255]))
        })
        .unwrap();
        assert_eq!(seen, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        let err = sample(Path::new("/tmp/a.mp4"), 5.0, 0.0, (300, 200)).unwrap_err();
        assert!(matches!(err, SampleError::BadInterval(_)));
    }
}
