use std::path::Path;
use std::sync::LazyLock;

use chrono::FixedOffset;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])([0-9]{2}):?([0-9]{2})$").unwrap());

fn default_tolerance_ms() -> u64 {
    10_000
}

fn default_utc_offset() -> FixedOffset {
    // Archive folders are named in JST.
    FixedOffset::east_opt(9 * 3600).unwrap()
}

fn default_min_year() -> i32 {
    1950
}

fn default_max_year() -> i32 {
    2030
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "tif", "tiff", "heic", "heif", "png", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mov", "m4v", "3gp", "avi", "mts", "m2ts", "mkv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sidecar_names() -> Vec<String> {
    vec![".picasa.ini".to_string()]
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

/// Parse a `+HH:MM` / `-HHMM` offset string.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let caps = OFFSET_RE.captures(s.trim())?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let secs = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(secs)
    } else {
        FixedOffset::east_opt(secs)
    }
}

fn deserialize_offset<'de, D>(deserializer: D) -> std::result::Result<FixedOffset, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_utc_offset(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid utc_offset {s:?}, expected +HH:MM")))
}

/// Tunables of the reconciliation engine. Defaults reproduce the behaviour
/// the archive tooling has always had.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Maximum allowed distance between two timestamps, in milliseconds
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: u64,

    /// Offset used for folder date ranges and offset-less Exif dates
    #[serde(default = "default_utc_offset", deserialize_with = "deserialize_offset")]
    pub utc_offset: FixedOffset,

    /// Lower year bound for month folders (exclusive)
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    /// Upper year bound for month folders (inclusive)
    #[serde(default = "default_max_year")]
    pub max_year: i32,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// File names that are never processed
    #[serde(default = "default_sidecar_names")]
    pub sidecar_names: Vec<String>,

    /// Program used to probe video containers
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tolerance_ms: default_tolerance_ms(),
            utc_offset: default_utc_offset(),
            min_year: default_min_year(),
            max_year: default_max_year(),
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
            sidecar_names: default_sidecar_names(),
            ffprobe: default_ffprobe(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        for ext in settings
            .image_extensions
            .iter_mut()
            .chain(settings.video_extensions.iter_mut())
        {
            *ext = ext.trim_start_matches('.').to_lowercase();
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_year >= self.max_year {
            return Err(Error::Config(format!(
                "min_year ({}) must be below max_year ({})",
                self.min_year, self.max_year
            )));
        }
        if self.ffprobe.trim().is_empty() {
            return Err(Error::Config("ffprobe must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn tolerance_ms(&self) -> i64 {
        i64::try_from(self.tolerance_ms).unwrap_or(i64::MAX)
    }

    pub fn is_sidecar(&self, file_name: &str) -> bool {
        self.sidecar_names.iter().any(|s| s == file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.tolerance_ms, 10_000);
        assert_eq!(s.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!((s.min_year, s.max_year), (1950, 2030));
        assert!(s.is_sidecar(".picasa.ini"));
        assert!(!s.is_sidecar("IMG_0001.jpg"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let s = Settings::from_toml("tolerance_ms = 2000\nutc_offset = \"-05:30\"\n").unwrap();
        assert_eq!(s.tolerance_ms, 2000);
        assert_eq!(s.utc_offset.local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(s.max_year, 2030);
        assert_eq!(s.ffprobe, "ffprobe");
    }

    #[test]
    fn test_extensions_normalized() {
        let s = Settings::from_toml("image_extensions = [\".JPG\", \"Png\"]").unwrap();
        assert_eq!(s.image_extensions, vec!["jpg", "png"]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Settings::from_toml("utc_offset = \"JST\"").is_err());
        assert!(Settings::from_toml("min_year = 2030\nmax_year = 2000").is_err());
        assert!(Settings::from_toml("tolerence_ms = 5").is_err());
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+0900").unwrap().local_minus_utc(), 32400);
        assert_eq!(parse_utc_offset("+00:00").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("+24:00").is_none());
        assert!(parse_utc_offset("9").is_none());
    }
}
