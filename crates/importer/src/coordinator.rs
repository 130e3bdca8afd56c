use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use project::StoredClip;
use timeline::Clip;

use crate::{worker, CancelToken, ExportGate, FrameSource, ImportConfig, ImportDeps, SourceRef};

/// Fans a batch of sources out to scoped worker threads and funnels their
/// results back over a single channel, so the batch result is only ever
/// written by one consumer. Failed items are logged and dropped; the batch
/// returns the clips that made it.
pub struct ImportCoordinator {
    deps: ImportDeps,
    cfg: ImportConfig,
    gate: ExportGate,
}

impl ImportCoordinator {
    pub fn new(deps: ImportDeps, cfg: ImportConfig) -> Self {
        if let Err(err) = fs::create_dir_all(cfg.scratch_dir()) {
            // Exports will fail individually and get logged there.
            warn!(
                target: "importer",
                dir = %cfg.scratch_dir().display(),
                error = %err,
                "could not create scratch directory"
            );
        }
        let gate = ExportGate::new(cfg.max_concurrent_exports);
        Self { deps, cfg, gate }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.cfg
    }

    pub fn import_batch(&self, sources: &[SourceRef]) -> Vec<Clip> {
        self.import_batch_with(sources, &CancelToken::new())
    }

    /// Blocks until every item in the batch is terminal. Completion order,
    /// not pick order: a short clip resolved late can land before a long
    /// export picked first.
    pub fn import_batch_with(&self, sources: &[SourceRef], cancel: &CancelToken) -> Vec<Clip> {
        if sources.is_empty() {
            return Vec::new();
        }
        info!(target: "importer", count = sources.len(), "starting import batch");

        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::scope(|scope| {
            for source in sources {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = worker::import_one(source, &self.deps, &self.cfg, &self.gate, cancel);
                    let _ = tx.send((source, result));
                });
            }
            drop(tx);

            let mut clips = Vec::new();
            for (source, result) in rx {
                match result {
                    Ok(clip) => clips.push(clip),
                    Err(err) => warn!(
                        target: "importer",
                        source = %source,
                        error = %err,
                        "import failed, item dropped from batch"
                    ),
                }
            }
            info!(
                target: "importer",
                imported = clips.len(),
                picked = sources.len(),
                "import batch finished"
            );
            clips
        })
    }
}

/// Rebuilds clips from stored records, re-sampling preview frames from each
/// backing file. Restored clips are already persisted, so a later timeline
/// clear leaves their files on disk.
pub fn restore_clips(
    rows: &[StoredClip],
    frames: &dyn FrameSource,
    cfg: &ImportConfig,
) -> Vec<Clip> {
    rows.iter()
        .map(|row| {
            let mut clip = Clip::restored(PathBuf::from(&row.path), row.duration_seconds);
            match frames.sample(
                clip.source_path(),
                clip.duration(),
                cfg.base_frame_interval,
                cfg.max_frame_size(),
            ) {
                Ok(sampled) => clip.set_frames(sampled),
                Err(err) => warn!(
                    target: "importer",
                    path = %row.path,
                    error = %err,
                    "could not re-sample restored clip"
                ),
            }
            clip
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use media_io::ExportError;

    use crate::worker::fakes::{deps, FakeExporter, FakeFrames, FakeSource};
    use crate::{ExportedFile, MediaExporter, ResolvedMedia};

    use super::*;

    fn coordinator(dir: &tempfile::TempDir, deps: ImportDeps, exports: usize) -> ImportCoordinator {
        let cfg = ImportConfig {
            scratch_dir: Some(dir.path().to_path_buf()),
            max_concurrent_exports: exports,
            ..Default::default()
        };
        ImportCoordinator::new(deps, cfg)
    }

    fn sources(names: &[&str]) -> Vec<SourceRef> {
        names.iter().map(|name| SourceRef::new(*name)).collect()
    }

    #[test]
    fn batch_of_three_yields_three_clips_under_a_single_permit() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(
            FakeSource {
                root: dir.path().to_path_buf(),
                missing: vec![],
            },
            FakeExporter::with_duration(Some(4.0)),
            FakeFrames {
                per_clip: 5,
                fail: false,
            },
        );
        let coord = coordinator(&dir, deps, 1);

        let clips = coord.import_batch(&sources(&["a.mov", "b.mov", "c.mov"]));
        assert_eq!(clips.len(), 3);
        for clip in &clips {
            assert_eq!(clip.duration(), 4.0);
            assert_eq!(clip.frames().len(), 5);
            assert!(clip.source_path().exists());
        }
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(
            FakeSource {
                root: dir.path().to_path_buf(),
                missing: vec![],
            },
            FakeExporter::with_duration(Some(1.0)),
            FakeFrames {
                per_clip: 0,
                fail: false,
            },
        );
        let coord = coordinator(&dir, deps, 1);
        assert!(coord.import_batch(&[]).is_empty());
    }

    #[test]
    fn failed_item_is_dropped_and_the_rest_survive() {
        let dir = tempfile::tempdir().unwrap();
        let deps = deps(
            FakeSource {
                root: dir.path().to_path_buf(),
                missing: vec!["b.mov".into()],
            },
            FakeExporter::with_duration(Some(2.0)),
            FakeFrames {
                per_clip: 3,
                fail: false,
            },
        );
        let coord = coordinator(&dir, deps, 1);

        let clips = coord.import_batch(&sources(&["a.mov", "b.mov", "c.mov"]));
        assert_eq!(clips.len(), 2);
    }

    /// Records how many exports overlap and refuses to exceed the cap.
    struct ConcurrencyProbe {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MediaExporter for ConcurrencyProbe {
        fn export(
            &self,
            _media: &ResolvedMedia,
            dest: &Path,
            _cancel: &CancelToken,
            _timeout: Duration,
        ) -> Result<ExportedFile, ExportError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            std::fs::write(dest, b"mp4")?;
            Ok(ExportedFile {
                path: dest.to_path_buf(),
                duration: Some(1.0),
            })
        }
    }

    #[test]
    fn concurrent_exports_never_exceed_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Arc::new(ConcurrencyProbe {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let deps = ImportDeps {
            source: Arc::new(FakeSource {
                root: dir.path().to_path_buf(),
                missing: vec![],
            }),
            exporter: probe.clone(),
            frames: Arc::new(FakeFrames {
                per_clip: 0,
                fail: false,
            }),
        };
        let coord = coordinator(&dir, deps, 2);

        let clips = coord.import_batch(&sources(&["a", "b", "c", "d", "e", "f"]));
        assert_eq!(clips.len(), 6);
        assert!(probe.peak.load(Ordering::SeqCst) <= 2);
    }

    /// Flips the shared token during its first call and reports cancellation,
    /// leaving nothing behind.
    struct CancellingExporter;

    impl MediaExporter for CancellingExporter {
        fn export(
            &self,
            _media: &ResolvedMedia,
            _dest: &Path,
            cancel: &CancelToken,
            _timeout: Duration,
        ) -> Result<ExportedFile, ExportError> {
            cancel.cancel();
            Err(ExportError::Cancelled)
        }
    }

    #[test]
    fn cancellation_drains_the_batch_without_leftover_files() {
        let dir = tempfile::tempdir().unwrap();
        let deps = ImportDeps {
            source: Arc::new(FakeSource {
                root: dir.path().to_path_buf(),
                missing: vec![],
            }),
            exporter: Arc::new(CancellingExporter),
            frames: Arc::new(FakeFrames {
                per_clip: 0,
                fail: false,
            }),
        };
        let coord = coordinator(&dir, deps, 1);

        let cancel = CancelToken::new();
        let clips = coord.import_batch_with(&sources(&["a.mov", "b.mov", "c.mov"]), &cancel);
        assert!(clips.is_empty());
        assert!(cancel.is_cancelled());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "mp4"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn restore_rebuilds_persisted_clips_with_fresh_frames() {
        let rows = vec![
            StoredClip {
                path: "/tmp/a.mp4".into(),
                duration_seconds: 10.0,
            },
            StoredClip {
                path: "/tmp/b.mp4".into(),
                duration_seconds: 2.5,
            },
        ];
        let frames = FakeFrames {
            per_clip: 4,
            fail: false,
        };
        let cfg = ImportConfig::default();

        let clips = restore_clips(&rows, &frames, &cfg);
        assert_eq!(clips.len(), 2);
        assert!(clips.iter().all(|c| c.is_persisted()));
        assert_eq!(clips[0].duration(), 10.0);
        assert_eq!(clips[0].frames().len(), 4);
    }

    #[test]
    fn restore_keeps_clips_whose_frames_cannot_be_sampled() {
        let rows = vec![StoredClip {
            path: "/tmp/gone.mp4".into(),
            duration_seconds: 8.0,
        }];
        let frames = FakeFrames {
            per_clip: 0,
            fail: true,
        };

        let clips = restore_clips(&rows, &frames, &ImportConfig::default());
        assert_eq!(clips.len(), 1);
        assert!(clips[0].frames().is_empty());
        assert_eq!(clips[0].duration(), 8.0);
    }
}
