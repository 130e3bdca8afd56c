use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use importer::ffmpeg::{ffmpeg_deps, FfmpegFrames};
use importer::{restore_clips, ImportConfig, ImportCoordinator, SourceRef};
use project::ClipDb;
use timeline::Timeline;

#[derive(Parser)]
#[command(name = "videostrip")]
#[command(about = "Headless video import and timeline-scrub operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Clip database path (defaults to the per-user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import videos, sample preview frames, and optionally persist the clips
    Import {
        /// Video files to import
        files: Vec<PathBuf>,

        /// How many exports may run at once
        #[arg(long, default_value = "1")]
        jobs: usize,

        /// Pipeline config as JSON (overrides --jobs)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Save the imported clips to the clip database
        #[arg(long)]
        save: bool,
    },

    /// List stored clips
    List,

    /// Map a scroll offset over the stored clips to a frame and elapsed time
    Scrub {
        /// Scroll offset in points
        #[arg(short, long)]
        offset: f64,

        /// Zoom scale
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },

    /// Delete every stored clip record
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let db_path = cli
        .db
        .unwrap_or_else(|| project::app_data_dir().join("videostrip.db"));

    match cli.command {
        Commands::Import {
            files,
            jobs,
            config,
            save,
        } => import_command(&db_path, files, jobs, config, save),
        Commands::List => list_command(&db_path),
        Commands::Scrub { offset, scale } => scrub_command(&db_path, offset, scale),
        Commands::Clear => clear_command(&db_path),
    }
}

fn load_config(path: Option<PathBuf>, jobs: usize) -> Result<ImportConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(ImportConfig {
            max_concurrent_exports: jobs,
            ..Default::default()
        }),
    }
}

fn import_command(
    db_path: &Path,
    files: Vec<PathBuf>,
    jobs: usize,
    config: Option<PathBuf>,
    save: bool,
) -> Result<()> {
    if files.is_empty() {
        warn!("no files given, nothing to import");
        return Ok(());
    }
    let cfg = load_config(config, jobs)?;
    let coordinator = ImportCoordinator::new(ffmpeg_deps(), cfg);

    let sources: Vec<SourceRef> = files.iter().map(|p| SourceRef::from(p.as_path())).collect();
    let mut clips = coordinator.import_batch(&sources);

    for clip in &clips {
        println!(
            "{}  {}  {} frames",
            clip.source_path().display(),
            timeline::format_progress(clip.duration(), clip.duration()),
            clip.frames().len()
        );
    }
    info!(imported = clips.len(), picked = sources.len(), "import done");

    if save {
        let db = ClipDb::open_or_create(db_path)?;
        db.save_all(&mut clips)?;
        info!(db = %db_path.display(), count = clips.len(), "clips saved");
    }
    Ok(())
}

fn list_command(db_path: &Path) -> Result<()> {
    let db = ClipDb::open_or_create(db_path)?;
    let rows = db.load_all()?;
    if rows.is_empty() {
        println!("no stored clips");
        return Ok(());
    }
    for row in &rows {
        println!(
            "{}  {}",
            row.path,
            timeline::format_progress(row.duration_seconds, row.duration_seconds)
        );
    }
    Ok(())
}

fn scrub_command(db_path: &Path, offset: f64, scale: f64) -> Result<()> {
    let db = ClipDb::open_or_create(db_path)?;
    let rows = db.load_all()?;
    let clips = restore_clips(&rows, &FfmpegFrames, &ImportConfig::default());

    let mut tl = Timeline::new();
    tl.append(clips);
    tl.set_scale(scale);

    let point = timeline::resolve(offset, &tl);
    match point.frame_index {
        Some(index) => println!("frame {index}"),
        None => println!("frame -"),
    }
    println!("{}", timeline::format_progress(point.elapsed, point.total));
    Ok(())
}

fn clear_command(db_path: &Path) -> Result<()> {
    let db = ClipDb::open_or_create(db_path)?;
    let count = db.count()?;
    db.delete_all()?;
    info!(removed = count, "clip store cleared");
    Ok(())
}
