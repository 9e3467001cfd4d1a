use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::classify::Verdict;
use crate::error::{Error, Result};
use crate::times::FileTimes;

/// Write the capture time back to the file's timestamps.
///
/// Refuses (returns `Ok(None)`) unless the verdict is an inconsistency whose
/// capture time lies inside the folder range. On success returns the instant
/// written.
pub async fn apply_correction<T: FileTimes>(
    times: &T,
    path: &Path,
    verdict: &Verdict,
) -> Result<Option<DateTime<Utc>>> {
    let Some(at) = verdict.correction() else {
        debug!("{}: {} verdict, not touching", path.display(), verdict.label());
        return Ok(None);
    };

    times.write(path, at).await.map_err(|source| Error::WriteTimes {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(at))
}
