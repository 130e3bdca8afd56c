//! Media probing via ffprobe's JSON output.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe not found on PATH; please install FFmpeg (ffprobe)")]
    FfprobeMissing,
    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FfprobeJson {
    streams: Option<Vec<FfprobeStream>>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration_seconds: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_video: bool,
}

pub fn probe_media(path: &Path) -> Result<MediaInfo, ProbeError> {
    let ffprobe = which::which("ffprobe").map_err(|_| ProbeError::FfprobeMissing)?;
    let out = Command::new(ffprobe)
        .arg("-v")
        .arg("error")
        .arg("-show_format")
        .arg("-show_streams")
        .arg("-print_format")
        .arg("json")
        .arg(path)
        .output()
        .map_err(|e| ProbeError::FfprobeFailed(e.to_string()))?;
    if !out.status.success() {
        return Err(ProbeError::FfprobeFailed(
            String::from_utf8_lossy(&out.stderr).into(),
        ));
    }
    let parsed: FfprobeJson =
        serde_json::from_slice(&out.stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;
    Ok(info_from_json(path, parsed))
}

fn info_from_json(path: &Path, parsed: FfprobeJson) -> MediaInfo {
    let mut width = None;
    let mut height = None;
    let mut has_video = false;

    for s in parsed.streams.as_deref().unwrap_or_default() {
        if s.codec_type.as_deref() == Some("video") {
            has_video = true;
            width = width.or(s.width);
            height = height.or(s.height);
        }
    }

    let duration_seconds = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse().ok());

    MediaInfo {
        path: path.to_path_buf(),
        duration_seconds,
        width,
        height,
        has_video,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_video_stream_and_duration() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.48"}
        }"#;
        let parsed: FfprobeJson = serde_json::from_str(json).unwrap();
        let info = info_from_json(Path::new("/tmp/a.mp4"), parsed);
        assert!(info.has_video);
        assert_eq!(info.width, Some(1920));
        assert_eq!(info.duration_seconds, Some(12.48));
    }

    #[test]
    fn audio_only_media_has_no_video() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        let parsed: FfprobeJson = serde_json::from_str(json).unwrap();
        let info = info_from_json(Path::new("/tmp/a.m4a"), parsed);
        assert!(!info.has_video);
        assert_eq!(info.duration_seconds, None);
    }
}
