//! Per-run transfer report: the listing audit trail plus three append-only
//! outcome lists, serialized once as indented JSON at run end.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

const REPORT_NAME_PREFIX: &str = "report";

/// Terminal classification of one listed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Succeeded,
    Skipped,
    Failed,
}

/// Accumulated outcome of one transfer run. Names are appended in listing
/// order and never removed; mutation happens on the single control thread.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    pub list_source_succeeded: Vec<String>,
    pub copy_succeeded: Vec<String>,
    pub copy_skipped: Vec<String>,
    pub copy_failed: Vec<String>,
}

impl TransferReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` was yielded by the source listing.
    pub fn record_listed(&mut self, name: &str) {
        self.list_source_succeeded.push(name.to_owned());
    }

    /// Appends `name` to exactly one of the three outcome lists.
    pub fn record(&mut self, name: &str, outcome: CopyOutcome) {
        let list = match outcome {
            CopyOutcome::Succeeded => &mut self.copy_succeeded,
            CopyOutcome::Skipped => &mut self.copy_skipped,
            CopyOutcome::Failed => &mut self.copy_failed,
        };
        list.push(name.to_owned());
    }

    /// Indented JSON snapshot of the current lists.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn log_summary(&self) {
        info!(
            listed = self.list_source_succeeded.len(),
            succeeded = self.copy_succeeded.len(),
            skipped = self.copy_skipped.len(),
            failed = self.copy_failed.len(),
            "transfer run summary"
        );
    }
}

/// File name for a report written at `timestamp`:
/// `report_<YYYY-MM-DD_HH-mm-ss-fff>.json`.
pub fn report_file_name(timestamp: NaiveDateTime) -> String {
    format!(
        "{REPORT_NAME_PREFIX}_{}.json",
        timestamp.format("%Y-%m-%d_%H-%M-%S-%3f")
    )
}

/// Writes the report once, indented, into `dir`; returns the file path.
pub fn write_report(dir: &Path, report: &TransferReport) -> io::Result<PathBuf> {
    let path = dir.join(report_file_name(chrono::Local::now().naive_local()));
    let json = report.to_pretty_json().map_err(io::Error::other)?;
    fs::write(&path, json)?;
    info!(path = %path.display(), "transfer report written");
    Ok(path)
}
