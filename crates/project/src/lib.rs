use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use timeline::Clip;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("videostrip")
}

/// One durable clip record. Frames are intentionally not persisted; the
/// engine re-samples them against `path` after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClip {
    pub path: String,
    pub duration_seconds: f64,
}

pub struct ClipDb {
    conn: Connection,
    path: PathBuf,
}

impl ClipDb {
    pub fn open_or_create(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        // Recommended PRAGMAs for a local interactive app DB
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_migrations(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the entire stored set: every prior record is deleted, then
    /// one row per clip is written. On success the clips are marked
    /// persisted, which keeps their backing files alive past a timeline
    /// clear.
    pub fn save_all(&self, clips: &mut [Clip]) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM clips", [])?;
        for clip in clips.iter() {
            tx.execute(
                "INSERT INTO clips(path, duration_seconds, created_at) VALUES(?1, ?2, ?3)",
                params![
                    clip.source_path().to_string_lossy(),
                    clip.duration(),
                    now
                ],
            )?;
        }
        tx.commit()?;
        for clip in clips.iter_mut() {
            clip.mark_persisted(true);
        }
        Ok(())
    }

    pub fn load_all(&self) -> Result<Vec<StoredClip>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, duration_seconds FROM clips ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredClip {
                path: row.get(0)?,
                duration_seconds: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn delete_all(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM clips", [])?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clips", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
    // Simple migration tracking by name
    conn.execute_batch(include_str!("../migrations/V0001__clips.sql"))?;
    conn.execute(
        "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
        params!["V0001__clips"],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, ClipDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = ClipDb::open_or_create(&dir.path().join("clips.db")).unwrap();
        (dir, db)
    }

    fn clip(path: &str, duration: f64) -> Clip {
        Clip::new(PathBuf::from(path), duration)
    }

    #[test]
    fn save_then_load_round_trips_path_and_duration() {
        let (_dir, db) = open_temp();
        let mut clips = vec![clip("/tmp/a.mp4", 12.5), clip("/tmp/b.mp4", 3.0)];
        db.save_all(&mut clips).unwrap();

        let mut stored = db.load_all().unwrap();
        stored.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            stored,
            vec![
                StoredClip {
                    path: "/tmp/a.mp4".into(),
                    duration_seconds: 12.5
                },
                StoredClip {
                    path: "/tmp/b.mp4".into(),
                    duration_seconds: 3.0
                },
            ]
        );
    }

    #[test]
    fn save_marks_clips_persisted() {
        let (_dir, db) = open_temp();
        let mut clips = vec![clip("/tmp/a.mp4", 1.0)];
        assert!(!clips[0].is_persisted());
        db.save_all(&mut clips).unwrap();
        assert!(clips[0].is_persisted());
    }

    #[test]
    fn save_replaces_prior_records() {
        let (_dir, db) = open_temp();
        db.save_all(&mut [clip("/tmp/a.mp4", 1.0), clip("/tmp/b.mp4", 2.0)])
            .unwrap();
        db.save_all(&mut [clip("/tmp/c.mp4", 3.0)]).unwrap();

        let stored = db.load_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].path, "/tmp/c.mp4");
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn delete_all_empties_the_store() {
        let (_dir, db) = open_temp();
        db.save_all(&mut [clip("/tmp/a.mp4", 1.0)]).unwrap();
        db.delete_all().unwrap();
        assert!(db.load_all().unwrap().is_empty());
    }

    #[test]
    fn reopening_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clips.db");
        {
            let db = ClipDb::open_or_create(&path).unwrap();
            db.save_all(&mut [clip("/tmp/a.mp4", 7.0)]).unwrap();
        }
        let db = ClipDb::open_or_create(&path).unwrap();
        assert_eq!(db.count().unwrap(), 1);
    }
}
