use std::fs;
use std::path::Path;

use tracing::{debug, warn};

mod export;
pub use export::{export_to_mp4, ExportError};
mod probe;
pub use probe::{probe_media, MediaInfo, ProbeError};
pub mod sampler;
pub use sampler::{sample, SampleError};

use timeline::FileStore;

/// Local-disk [`FileStore`]: removes a file if present, silently accepts an
/// absent path, and logs (but swallows) anything else.
pub struct DiskFileStore;

impl FileStore for DiskFileStore {
    fn delete(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(target: "media_io", path = %path.display(), "deleted file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(target: "media_io", path = %path.display(), error = %e, "failed to delete file")
            }
        }
    }
}
