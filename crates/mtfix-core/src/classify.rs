use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::folder_range::DateRange;
use crate::times::FileTimestamps;

/// Which comparisons exceeded the tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Discrepancies {
    /// Capture time outside the folder range, or no range to check against
    pub out_of_range: bool,
    pub change_vs_modify: bool,
    pub change_vs_creation: bool,
    pub change_vs_capture: bool,
}

impl Discrepancies {
    pub fn any(&self) -> bool {
        self.out_of_range || self.change_vs_modify || self.change_vs_creation || self.change_vs_capture
    }

    /// Short names of the failed checks, for reports.
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.out_of_range, "range"),
            (self.change_vs_modify, "ctime/mtime"),
            (self.change_vs_creation, "ctime/birthtime"),
            (self.change_vs_capture, "ctime/capture"),
        ]
        .into_iter()
        .filter_map(|(hit, label)| hit.then_some(label))
        .collect()
    }
}

/// What should happen to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every available source agrees.
    Consistent { capture: DateTime<Utc> },
    /// No usable capture time. `unconstrained` is set when the folder check
    /// was waived for this run.
    MissingMetadata { unconstrained: bool },
    /// The capture time disagrees with the filesystem or folder. `in_range`
    /// tells whether writing it back is safe.
    Inconsistent {
        capture: DateTime<Utc>,
        discrepancies: Discrepancies,
        in_range: bool,
    },
}

impl Verdict {
    pub fn is_consistent(&self) -> bool {
        matches!(self, Verdict::Consistent { .. })
    }

    /// Whether applying the capture time would stay within the folder range
    /// (or no range constraint is in effect).
    pub fn fixable(&self) -> bool {
        match *self {
            Verdict::Consistent { .. } => true,
            Verdict::MissingMetadata { unconstrained } => unconstrained,
            Verdict::Inconsistent { in_range, .. } => in_range,
        }
    }

    pub fn capture(&self) -> Option<DateTime<Utc>> {
        match *self {
            Verdict::Consistent { capture } | Verdict::Inconsistent { capture, .. } => Some(capture),
            Verdict::MissingMetadata { .. } => None,
        }
    }

    /// The instant to write back, if a correction is both needed and safe.
    pub fn correction(&self) -> Option<DateTime<Utc>> {
        match *self {
            Verdict::Inconsistent {
                capture,
                in_range: true,
                ..
            } => Some(capture),
            _ => None,
        }
    }

    pub fn discrepancies(&self) -> Option<Discrepancies> {
        match *self {
            Verdict::Inconsistent { discrepancies, .. } => Some(discrepancies),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Consistent { .. } => "consistent",
            Verdict::MissingMetadata { .. } => "missing-metadata",
            Verdict::Inconsistent { in_range: true, .. } => "fixable",
            Verdict::Inconsistent { in_range: false, .. } => "unfixable",
        }
    }
}

fn apart(a: DateTime<Utc>, b: DateTime<Utc>, tolerance_ms: i64) -> bool {
    (a.timestamp_millis() - b.timestamp_millis()).abs() > tolerance_ms
}

/// Combine filesystem timestamps, folder range and capture time into a verdict.
///
/// The folder range is a sanity bound: a capture time outside it is reported
/// but never written back unless `ignore_dir_constraint` waives the check.
pub fn classify(
    timestamps: &FileTimestamps,
    range: Option<&DateRange>,
    capture: Option<DateTime<Utc>>,
    ignore_dir_constraint: bool,
    tolerance_ms: i64,
) -> Verdict {
    let Some(capture) = capture else {
        return Verdict::MissingMetadata {
            unconstrained: ignore_dir_constraint,
        };
    };

    let in_range = ignore_dir_constraint || range.is_some_and(|r| r.contains(capture));
    let changed = timestamps.changed;
    let discrepancies = Discrepancies {
        out_of_range: !in_range,
        change_vs_modify: apart(changed, timestamps.modified, tolerance_ms),
        change_vs_creation: timestamps
            .created
            .is_some_and(|created| apart(changed, created, tolerance_ms)),
        change_vs_capture: apart(changed, capture, tolerance_ms),
    };

    if discrepancies.any() {
        Verdict::Inconsistent {
            capture,
            discrepancies,
            in_range,
        }
    } else {
        Verdict::Consistent { capture }
    }
}
