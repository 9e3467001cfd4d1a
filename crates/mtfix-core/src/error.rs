use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reconciling a single file or loading settings.
///
/// Per-file variants are logged and counted by the run loop; only `Config`
/// is fatal, and it is raised before any file is touched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: year folder {dir_year} does not match {name_year}", .path.display())]
    PathYearMismatch {
        path: PathBuf,
        dir_year: i32,
        name_year: i32,
    },

    #[error("{}: month {month} out of range", .path.display())]
    MonthOutOfRange { path: PathBuf, month: u32 },

    #[error("{}: year {year} out of range ({min}, {max}]", .path.display())]
    YearOutOfRange {
        path: PathBuf,
        year: i32,
        min: i32,
        max: i32,
    },

    #[error("{}: failed to read Exif: {message}", .path.display())]
    ExifRead { path: PathBuf, message: String },

    #[error("{}: malformed date {value:?}", .path.display())]
    MalformedDate { path: PathBuf, value: String },

    #[error("{}: failed to run video prober: {source}", .path.display())]
    ProbeSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: stat failed: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{}: failed to set timestamps: {source}", .path.display())]
    WriteTimes {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
