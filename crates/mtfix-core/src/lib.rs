pub mod cancel;
pub mod classify;
pub mod date;
pub mod error;
pub mod folder_range;
pub mod media;
pub mod report;
pub mod scan;
pub mod settings;
pub mod times;
pub mod writer;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

pub use cancel::CancellationToken;
pub use classify::{classify, Discrepancies, Verdict};
pub use error::{Error, Result};
pub use folder_range::{DateRange, PathRangeResolver};
pub use media::MediaKind;
pub use report::{FileReport, JsonLinesReporter, MultiReporter, Reporter, TextReporter};
pub use settings::Settings;
pub use times::{FileTimes, FileTimestamps, OsFileTimes};

use date::exif::{ExifFileReader, ImageMetadataReader};
use date::video::{Ffprobe, VideoProber};
use date::MetadataExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report only
    Check,
    /// Report and correct
    Fix,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// File or directory to reconcile
    pub target: PathBuf,
    pub mode: Mode,
    /// Skip the folder range check for every file
    pub ignore_dir_constraint: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    /// Regular files considered
    pub total: u64,
    /// Files with a non-consistent verdict
    pub flagged: u64,
    /// Files whose timestamps were rewritten
    pub fixed: u64,
    /// Stat, walk and write failures
    pub errors: u64,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            total: 0,
            flagged: 0,
            fixed: 0,
            errors: 0,
            interrupted: false,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Check if self.flagged == 0 => write!(f, "no target files")?,
            Mode::Check => write!(f, "{} files, {} flagged", self.total, self.flagged)?,
            Mode::Fix if self.fixed == 0 => write!(f, "no fixable files")?,
            Mode::Fix => write!(f, "{} files, {} fixed", self.total, self.fixed)?,
        }
        if self.errors > 0 {
            write!(f, ", {} errors", self.errors)?;
        }
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

/// Per-file result of the pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    Consistent,
    /// Timestamps could not be read; nothing else was attempted.
    Unreadable,
    Reported(FileReport),
}

/// The reconciliation pipeline: folder range, capture time, verdict, and
/// (in fix mode) correction, one file at a time.
pub struct Engine<R, P, T> {
    settings: Settings,
    resolver: PathRangeResolver,
    extractor: MetadataExtractor<R, P>,
    times: T,
}

impl Engine<ExifFileReader, Ffprobe, OsFileTimes> {
    /// Engine wired to kamadak-exif, ffprobe and the real filesystem.
    pub fn new(settings: Settings) -> Self {
        let prober = Ffprobe::new(settings.ffprobe.clone());
        Self::with_collaborators(settings, ExifFileReader, prober, OsFileTimes)
    }
}

impl<R: ImageMetadataReader, P: VideoProber, T: FileTimes> Engine<R, P, T> {
    pub fn with_collaborators(settings: Settings, reader: R, prober: P, times: T) -> Self {
        let resolver = PathRangeResolver::new(&settings);
        let extractor = MetadataExtractor::new(reader, prober, settings.utc_offset);
        Self {
            settings,
            resolver,
            extractor,
            times,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process every file under `options.target`, strictly in sequence.
    ///
    /// Per-file failures are logged and counted; only a failing reporter
    /// aborts the run.
    pub async fn run(
        &self,
        options: &RunOptions,
        reporter: &mut dyn Reporter,
        cancel: Option<&CancellationToken>,
    ) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::new(options.mode);

        let scan = scan::scan_files(&options.target, &self.settings);
        summary.errors += scan.errors;
        info!(
            "{} files under {} ({} sidecars skipped)",
            scan.files.len(),
            options.target.display(),
            scan.sidecars_skipped
        );

        for path in &scan.files {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                warn!("Interrupted, {} files left unprocessed", scan.files.len() as u64 - summary.total);
                summary.interrupted = true;
                break;
            }

            summary.total += 1;
            match self.process_file(path, options).await {
                FileOutcome::Consistent => {}
                FileOutcome::Unreadable => summary.errors += 1,
                FileOutcome::Reported(report) => {
                    summary.flagged += 1;
                    if report.applied.is_some() {
                        summary.fixed += 1;
                    }
                    if report.error.is_some() {
                        summary.errors += 1;
                    }
                    reporter
                        .file(options.mode, &report)
                        .context("failed to write report")?;
                }
            }
        }

        reporter.summary(&summary).context("failed to write summary")?;
        Ok(summary)
    }

    /// Run the pipeline for a single file.
    pub async fn process_file(&self, path: &Path, options: &RunOptions) -> FileOutcome {
        let timestamps = match self.times.read(path).await {
            Ok(ts) => ts,
            Err(source) => {
                warn!(
                    "{}",
                    Error::Stat {
                        path: path.to_path_buf(),
                        source,
                    }
                );
                return FileOutcome::Unreadable;
            }
        };

        let range = self.resolver.resolve(path);
        let kind = MediaKind::from_path(path, &self.settings);
        let capture = self.extractor.extract(path, kind).await;
        let verdict = classify(
            &timestamps,
            range.as_ref(),
            capture,
            options.ignore_dir_constraint,
            self.settings.tolerance_ms(),
        );

        if verdict.is_consistent() {
            return FileOutcome::Consistent;
        }

        let mut report = FileReport::new(path.to_path_buf(), &verdict, timestamps, range);
        if options.mode == Mode::Fix {
            match writer::apply_correction(&self.times, path, &verdict).await {
                Ok(applied) => report.applied = applied,
                Err(e) => {
                    warn!("{}", e);
                    report.error = Some(e.to_string());
                }
            }
        }
        FileOutcome::Reported(report)
    }
}
