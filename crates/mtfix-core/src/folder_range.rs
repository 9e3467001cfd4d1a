use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::error;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// `/<YYYY>/<YYYY>-<label?><MM>` with the month not followed by another digit
static MONTH_FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?P<dir>[0-9]{4})/(?P<year>[0-9]{4})-[^/0-9]*(?P<month>[0-9]{2})(?:[^0-9]|$)").unwrap()
});

/// `/<YYYY>/<YYYY>-` followed by a non-digit
static YEAR_FOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?P<dir>[0-9]{4})/(?P<year>[0-9]{4})-[^0-9]").unwrap());

/// Half-open interval `[begin, end)` a file is expected to have been captured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.begin <= t && t < self.end
    }
}

/// Derives the expected capture period from a year/month folder layout.
#[derive(Debug, Clone)]
pub struct PathRangeResolver {
    offset: FixedOffset,
    min_year: i32,
    max_year: i32,
}

impl PathRangeResolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            offset: settings.utc_offset,
            min_year: settings.min_year,
            max_year: settings.max_year,
        }
    }

    /// Resolve the folder range for `path`. Convention mismatches are logged
    /// and yield `None`, same as a path outside the dated tree.
    pub fn resolve(&self, path: &Path) -> Option<DateRange> {
        match self.try_resolve(path) {
            Ok(range) => range,
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but reports convention mismatches as errors.
    pub fn try_resolve(&self, path: &Path) -> Result<Option<DateRange>> {
        let normalized: String = path.to_string_lossy().replace('\\', "/").nfc().collect();

        if let Some(caps) = MONTH_FOLDER_RE.captures(&normalized) {
            let year = self.folder_year(path, &caps["dir"], &caps["year"])?;
            let month: u32 = caps["month"].parse().unwrap_or(0);
            if !(1..=12).contains(&month) {
                return Err(Error::MonthOutOfRange {
                    path: path.to_path_buf(),
                    month,
                });
            }
            if year <= self.min_year || year > self.max_year {
                return Err(Error::YearOutOfRange {
                    path: path.to_path_buf(),
                    year,
                    min: self.min_year,
                    max: self.max_year,
                });
            }
            let (end_year, end_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
            return Ok(self.range(path, (year, month), (end_year, end_month)));
        }

        if let Some(caps) = YEAR_FOLDER_RE.captures(&normalized) {
            let year = self.folder_year(path, &caps["dir"], &caps["year"])?;
            return Ok(self.range(path, (year, 1), (year + 1, 1)));
        }

        Ok(None)
    }

    /// Both year occurrences must agree.
    fn folder_year(&self, path: &Path, dir: &str, name: &str) -> Result<i32> {
        let dir_year: i32 = dir.parse().unwrap_or(-1);
        let name_year: i32 = name.parse().unwrap_or(-1);
        if dir_year != name_year {
            return Err(Error::PathYearMismatch {
                path: path.to_path_buf(),
                dir_year,
                name_year,
            });
        }
        Ok(dir_year)
    }

    fn range(&self, path: &Path, begin: (i32, u32), end: (i32, u32)) -> Option<DateRange> {
        let begin = self.first_of_month(begin)?;
        let end = self.first_of_month(end)?;
        if begin >= end {
            error!("{}: empty folder range", path.display());
            return None;
        }
        Some(DateRange { begin, end })
    }

    fn first_of_month(&self, (year, month): (i32, u32)) -> Option<DateTime<Utc>> {
        self.offset
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
