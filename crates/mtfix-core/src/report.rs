use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::classify::{Discrepancies, Verdict};
use crate::folder_range::DateRange;
use crate::times::FileTimestamps;
use crate::{Mode, RunSummary};

/// Everything known about one non-consistent file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub verdict: &'static str,
    pub fixable: bool,
    pub timestamps: FileTimestamps,
    pub capture: Option<DateTime<Utc>>,
    pub range: Option<DateRange>,
    pub discrepancies: Option<Discrepancies>,
    /// Instant written back in fix mode
    pub applied: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(
        path: PathBuf,
        verdict: &Verdict,
        timestamps: FileTimestamps,
        range: Option<DateRange>,
    ) -> Self {
        Self {
            path,
            verdict: verdict.label(),
            fixable: verdict.fixable(),
            timestamps,
            capture: verdict.capture(),
            range,
            discrepancies: verdict.discrepancies(),
            applied: None,
            error: None,
        }
    }
}

/// Where per-file reports and the run summary go.
pub trait Reporter {
    fn file(&mut self, mode: Mode, report: &FileReport) -> io::Result<()>;
    fn summary(&mut self, summary: &RunSummary) -> io::Result<()>;
}

/// Human-readable report: the path, then indented timestamp lines.
pub struct TextReporter<W> {
    out: W,
    offset: FixedOffset,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W, offset: FixedOffset) -> Self {
        Self { out, offset }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn fmt(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.offset)
            .format("%Y-%m-%d %H:%M:%S%.3f %:z")
            .to_string()
    }

    fn fmt_opt(&self, t: Option<DateTime<Utc>>) -> String {
        t.map(|t| self.fmt(t)).unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn file(&mut self, mode: Mode, r: &FileReport) -> io::Result<()> {
        let ts = &r.timestamps;
        let range = match &r.range {
            Some(range) => format!("{} - {}", self.fmt(range.begin), self.fmt(range.end)),
            None => "UNKNOWN".to_string(),
        };
        let mut verdict = r.verdict.to_string();
        if let Some(d) = &r.discrepancies {
            verdict = format!("{} ({})", verdict, d.labels().join(", "));
        }

        writeln!(self.out, "{}", r.path.display())?;
        writeln!(self.out, "    ctime:     {}", self.fmt(ts.changed))?;
        writeln!(self.out, "    mtime:     {}", self.fmt(ts.modified))?;
        writeln!(self.out, "    birthtime: {}", self.fmt_opt(ts.created))?;
        writeln!(self.out, "    capture:   {}", self.fmt_opt(r.capture))?;
        writeln!(self.out, "    range:     {}", range)?;
        writeln!(self.out, "    verdict:   {}", verdict)?;

        if mode == Mode::Fix {
            match (&r.applied, &r.error) {
                (Some(at), _) => writeln!(self.out, "  fixed to {}", self.fmt(*at))?,
                (None, Some(e)) => writeln!(self.out, "  fix failed: {}", e)?,
                (None, None) => writeln!(self.out, "  not fixed")?,
            }
        }
        Ok(())
    }

    fn summary(&mut self, s: &RunSummary) -> io::Result<()> {
        writeln!(self.out, "{}", s)?;
        self.out.flush()
    }
}

/// One JSON object per reported file.
pub struct JsonLinesReporter<W> {
    out: W,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    mode: Mode,
    #[serde(flatten)]
    report: &'a FileReport,
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn file(&mut self, mode: Mode, report: &FileReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &JsonLine { mode, report })?;
        writeln!(self.out)
    }

    fn summary(&mut self, _summary: &RunSummary) -> io::Result<()> {
        self.out.flush()
    }
}

/// Fan reports out to several sinks.
#[derive(Default)]
pub struct MultiReporter {
    sinks: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn Reporter>) {
        self.sinks.push(sink);
    }
}

impl Reporter for MultiReporter {
    fn file(&mut self, mode: Mode, report: &FileReport) -> io::Result<()> {
        self.sinks.iter_mut().try_for_each(|s| s.file(mode, report))
    }

    fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.sinks.iter_mut().try_for_each(|s| s.summary(summary))
    }
}
