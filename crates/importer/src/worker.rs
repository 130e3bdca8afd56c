use std::fs;

use tracing::{debug, warn};
use uuid::Uuid;

use timeline::Clip;

use crate::{CancelToken, ExportGate, ImportConfig, ImportDeps, ImportError, SourceRef};

/// Runs one source through the whole pipeline. Resolution happens outside
/// the gate; only the export stage holds a permit. A sampling failure is
/// not terminal, the clip just carries no preview frames.
pub(crate) fn import_one(
    source: &SourceRef,
    deps: &ImportDeps,
    cfg: &ImportConfig,
    gate: &ExportGate,
    cancel: &CancelToken,
) -> Result<Clip, ImportError> {
    if cancel.is_cancelled() {
        return Err(media_io::ExportError::Cancelled.into());
    }

    debug!(target: "importer", source = %source, "resolving");
    let media = deps
        .source
        .resolve(source)
        .map_err(|err| ImportError::NotFound(err.to_string()))?;

    let permit = gate
        .acquire(cancel)
        .ok_or(media_io::ExportError::Cancelled)?;
    let dest = cfg.scratch_dir().join(format!("{}.mp4", Uuid::new_v4()));
    debug!(target: "importer", source = %source, dest = %dest.display(), "exporting");
    let exported = deps.exporter.export(&media, &dest, cancel, cfg.export_timeout())?;
    drop(permit);

    let Some(duration) = exported.duration else {
        // Without a measured duration the clip cannot be laid out.
        let _ = fs::remove_file(&exported.path);
        return Err(ImportError::DurationUnavailable(exported.path));
    };

    let mut clip = Clip::new(exported.path, duration);
    match deps.frames.sample(
        clip.source_path(),
        duration,
        cfg.base_frame_interval,
        cfg.max_frame_size(),
    ) {
        Ok(frames) => clip.set_frames(frames),
        Err(err) => warn!(
            target: "importer",
            clip = %clip.id(),
            error = %err,
            "sampling failed, clip kept without preview frames"
        ),
    }
    debug!(
        target: "importer",
        clip = %clip.id(),
        duration,
        frames = clip.frames().len(),
        "import finished"
    );
    Ok(clip)
}
