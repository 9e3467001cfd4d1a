use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use exif::{In, Reader, Tag, Value};
use regex::Regex;
use thiserror::Error;

static EXIF_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}:[0-9]{2}:[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$").unwrap());

/// Raw date strings of interest in an image's Exif block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifDates {
    /// `DateTimeDigitized` (a.k.a. CreateDate)
    pub create_date: Option<String>,
    pub date_time_original: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExifReadError {
    /// The container has no Exif segment at all. Not a failure.
    #[error("no Exif segment")]
    NoSegment,
    #[error("{0}")]
    Failed(String),
}

#[allow(async_fn_in_trait)]
pub trait ImageMetadataReader {
    async fn read_dates(&self, path: &Path) -> Result<ExifDates, ExifReadError>;
}

/// Reads Exif with kamadak-exif on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifFileReader;

impl ImageMetadataReader for ExifFileReader {
    async fn read_dates(&self, path: &Path) -> Result<ExifDates, ExifReadError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || read_dates_blocking(&path))
            .await
            .map_err(|e| ExifReadError::Failed(e.to_string()))?
    }
}

fn read_dates_blocking(path: &Path) -> Result<ExifDates, ExifReadError> {
    let file = File::open(path).map_err(|e| ExifReadError::Failed(e.to_string()))?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Err(ExifReadError::NoSegment),
        Err(e) => return Err(ExifReadError::Failed(e.to_string())),
    };

    Ok(ExifDates {
        create_date: ascii_field(&exif, Tag::DateTimeDigitized),
        date_time_original: ascii_field(&exif, Tag::DateTimeOriginal),
    })
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(vec) if !vec.is_empty() => {
            Some(String::from_utf8_lossy(&vec[0]).trim_end_matches('\0').trim().to_string())
        }
        _ => None,
    }
}

/// Outcome of parsing one Exif date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifDate {
    Valid(DateTime<Utc>),
    /// Right layout, but not a usable instant (zero date, epoch, Feb 30th...)
    Placeholder,
    /// Not `YYYY:MM:DD hh:mm:ss`
    Malformed,
}

/// Parse the fixed `YYYY:MM:DD hh:mm:ss` layout. Exif dates carry no zone,
/// so they are read at `offset`.
pub fn parse_exif_date(s: &str, offset: &FixedOffset) -> ExifDate {
    let s = s.trim();
    if !EXIF_DATE_RE.is_match(s) {
        return ExifDate::Malformed;
    }
    let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S") else {
        return ExifDate::Placeholder;
    };
    match offset.from_local_datetime(&naive).single() {
        Some(dt) if dt.timestamp() != 0 => ExifDate::Valid(dt.with_timezone(&Utc)),
        _ => ExifDate::Placeholder,
    }
}
