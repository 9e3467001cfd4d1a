use std::io;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

static CREATION_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"creation_time\s*:\s*(?P<value>[0-9]{4}-[0-9]{2}-[0-9]{2}[T ][0-9]{2}:[0-9]{2}:[0-9]{2}\S*)")
        .unwrap()
});

/// Runs an external container prober and hands back its diagnostic text.
#[allow(async_fn_in_trait)]
pub trait VideoProber {
    async fn probe(&self, path: &Path) -> io::Result<String>;
}

/// `ffprobe <file>`; stream info is printed on stderr.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    program: String,
}

impl Ffprobe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl VideoProber for Ffprobe {
    async fn probe(&self, path: &Path) -> io::Result<String> {
        let output = tokio::process::Command::new(&self.program)
            .arg("-hide_banner")
            .arg(path)
            .stdin(std::process::Stdio::null())
            .output()
            .await?;

        // Non-zero exit just means nothing useful was printed.
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        Ok(text)
    }
}

/// Outcome of scanning prober output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbedTime {
    Valid(DateTime<Utc>),
    Absent,
    Placeholder,
    Malformed(String),
}

/// Find the first `creation_time : ...` line. Values without an explicit
/// zone are UTC, which is what containers store.
pub fn scan_creation_time(text: &str) -> ProbedTime {
    let Some(caps) = CREATION_TIME_RE.captures(text) else {
        return ProbedTime::Absent;
    };
    let value = &caps["value"];

    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|naive| naive.and_utc())
        });

    match parsed {
        Some(dt) if dt.timestamp() == 0 => ProbedTime::Placeholder,
        Some(dt) => ProbedTime::Valid(dt),
        None if value.starts_with("0000-00-00") => ProbedTime::Placeholder,
        None => ProbedTime::Malformed(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FFPROBE_MOV: &str = r#"Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'IMG_0420.MOV':
  Metadata:
    major_brand     : qt
    minor_version   : 0
    compatible_brands: qt
    creation_time   : 2022-05-15T01:00:00.000000Z
    com.apple.quicktime.make: Apple
  Duration: 00:00:04.20, start: 0.000000, bitrate: 8533 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(tv, bt709), 1920x1080, 8390 kb/s, 29.98 fps
    Metadata:
      creation_time   : 2022-05-15T01:00:05.000000Z
"#;

    #[test]
    fn test_first_creation_time_wins() {
        let expected = Utc.with_ymd_and_hms(2022, 5, 15, 1, 0, 0).unwrap();
        assert_eq!(scan_creation_time(FFPROBE_MOV), ProbedTime::Valid(expected));
    }

    #[test]
    fn test_legacy_space_layout() {
        let text = "    creation_time   : 2015-03-01 10:20:30\n";
        let expected = Utc.with_ymd_and_hms(2015, 3, 1, 10, 20, 30).unwrap();
        assert_eq!(scan_creation_time(text), ProbedTime::Valid(expected));
    }

    #[test]
    fn test_absent_and_placeholder() {
        assert_eq!(scan_creation_time("Input #0, avi, from 'x.avi':\n"), ProbedTime::Absent);
        assert_eq!(
            scan_creation_time("creation_time   : 1970-01-01T00:00:00.000000Z"),
            ProbedTime::Placeholder
        );
        assert_eq!(
            scan_creation_time("creation_time   : 0000-00-00T00:00:00.000000Z"),
            ProbedTime::Placeholder
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            scan_creation_time("creation_time   : 2022-13-45T99:00:00Z"),
            ProbedTime::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let prober = Ffprobe::new("mtfix-no-such-prober");
        assert!(prober.probe(Path::new("clip.mp4")).await.is_err());
    }
}
