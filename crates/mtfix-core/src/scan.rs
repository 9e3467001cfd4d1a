use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::settings::Settings;

/// Files found under a root.
pub struct ScanResult {
    /// Regular files, in traversal order
    pub files: Vec<PathBuf>,
    pub sidecars_skipped: u64,
    /// Entries that could not be read during the walk
    pub errors: u64,
}

/// Every regular file at or beneath `root`, minus known sidecar files.
/// `root` may itself be a file. Order is whatever the traversal yields.
pub fn scan_files(root: &Path, settings: &Settings) -> ScanResult {
    let mut files = Vec::new();
    let mut sidecars_skipped = 0;
    let mut errors = 0;

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("{}", Error::Walk(e));
                errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if settings.is_sidecar(&name) {
            debug!("{}: sidecar, skipped", entry.path().display());
            sidecars_skipped += 1;
            continue;
        }

        files.push(entry.into_path());
    }

    debug!("Found {} files under {}", files.len(), root.display());

    ScanResult {
        files,
        sidecars_skipped,
        errors,
    }
}
