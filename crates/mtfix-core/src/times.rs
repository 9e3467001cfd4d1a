use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde::Serialize;
use tracing::debug;

/// Snapshot of a file's filesystem timestamps, taken once per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileTimestamps {
    /// Status change time (`st_ctime`); modify time where the platform has none
    pub changed: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// Birth time, when the platform reports one
    pub created: Option<DateTime<Utc>>,
}

impl FileTimestamps {
    pub fn from_metadata(meta: &Metadata) -> Self {
        let modified = to_utc(FileTime::from_last_modification_time(meta)).unwrap_or_default();
        let created = FileTime::from_creation_time(meta).and_then(to_utc);

        #[cfg(unix)]
        let changed = {
            use std::os::unix::fs::MetadataExt;
            DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32).unwrap_or(modified)
        };
        #[cfg(not(unix))]
        let changed = modified;

        Self {
            changed,
            modified,
            created,
        }
    }
}

fn to_utc(ft: FileTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ft.unix_seconds(), ft.nanoseconds())
}

/// Read and rewrite filesystem timestamps. The run loop only touches file
/// times through this seam.
#[allow(async_fn_in_trait)]
pub trait FileTimes {
    async fn read(&self, path: &Path) -> io::Result<FileTimestamps>;

    /// Set access, modify and (where supported) creation time to `at`.
    async fn write(&self, path: &Path, at: DateTime<Utc>) -> io::Result<()>;
}

/// [`FileTimes`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileTimes;

impl FileTimes for OsFileTimes {
    async fn read(&self, path: &Path) -> io::Result<FileTimestamps> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileTimestamps::from_metadata(&meta))
    }

    async fn write(&self, path: &Path, at: DateTime<Utc>) -> io::Result<()> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || set_times_blocking(&path, at))
            .await
            .map_err(io::Error::other)?
    }
}

fn set_times_blocking(path: &Path, at: DateTime<Utc>) -> io::Result<()> {
    let ft = FileTime::from_unix_time(at.timestamp(), at.timestamp_subsec_nanos());
    filetime::set_file_times(path, ft, ft)?;

    if let Err(e) = set_creation_time(path, at) {
        debug!("{}: creation time not updated: {}", path.display(), e);
    }
    Ok(())
}

#[cfg(any(target_os = "macos", windows))]
fn set_creation_time(path: &Path, at: DateTime<Utc>) -> io::Result<()> {
    #[cfg(target_os = "macos")]
    use std::os::macos::fs::FileTimesExt;
    #[cfg(windows)]
    use std::os::windows::fs::FileTimesExt;

    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    let times = std::fs::FileTimes::new().set_created(std::time::SystemTime::from(at));
    file.set_times(times)
}

#[cfg(not(any(target_os = "macos", windows)))]
fn set_creation_time(_path: &Path, _at: DateTime<Utc>) -> io::Result<()> {
    Ok(())
}
