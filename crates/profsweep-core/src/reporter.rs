//! Reporter trait for dependency injection
//!
//! The orchestrator reports every record, folder and action through this trait
//! without being coupled to a particular terminal renderer or output format.

use crate::classify::Classification;
use crate::fs::RemovalTally;
use crate::orphan::FolderVerdict;
use crate::types::{FolderRecord, ProfileRecord};
use serde::Serialize;

/// One profile line.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport<'a> {
    /// The record.
    pub record: &'a ProfileRecord,
    /// Its classification.
    pub classification: Classification,
    /// Folder size in bytes, when sizes were requested.
    pub size: Option<u64>,
}

/// One folder line.
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport<'a> {
    /// The folder.
    pub folder: &'a FolderRecord,
    /// Its verdict.
    pub verdict: FolderVerdict,
    /// Size in bytes, when sizes were requested.
    pub size: Option<u64>,
}

/// Totals for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records reported (after hide filters).
    pub listed: usize,
    /// Entries dropped during normalization.
    pub dropped: usize,
    /// Deletable records.
    pub candidates: usize,
    /// Profiles deleted.
    pub deleted: usize,
    /// Profile deletions that failed.
    pub failed: usize,
    /// Successful registry repairs after a failed delete.
    pub repaired: usize,
    /// Orphan folders found.
    pub orphans: usize,
    /// Orphan folders removed without leftovers.
    pub orphans_removed: usize,
    /// Filesystem entries removed and left behind across all orphans.
    pub orphan_entries: RemovalTally,
}

/// Receives every user-visible event of a run.
///
/// The text and JSON front ends implement this; [`NullReporter`] drops everything.
pub trait Reporter {
    /// Start a new output section (e.g. "Profiles", "Orphan folders").
    fn section(&self, title: &str);

    /// Report a classified profile.
    fn profile(&self, report: &ProfileReport<'_>);

    /// A deletion is about to start.
    fn removing(&self, record: &ProfileRecord);

    /// A profile operation completed.
    fn done(&self, record: &ProfileRecord, detail: &str);

    /// A profile operation failed.
    fn failed(&self, record: &ProfileRecord, reason: &str);

    /// Outcome of a registry repair attempt.
    fn repaired(&self, record: &ProfileRecord, success: bool, detail: &str);

    /// Report a folder verdict.
    fn folder(&self, report: &FolderReport<'_>);

    /// An orphan folder removal finished (possibly partially).
    fn folder_removed(&self, folder: &FolderRecord, tally: RemovalTally);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display the final totals.
    fn summary(&self, summary: &RunSummary);
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn profile(&self, _: &ProfileReport<'_>) {}
    fn removing(&self, _: &ProfileRecord) {}
    fn done(&self, _: &ProfileRecord, _: &str) {}
    fn failed(&self, _: &ProfileRecord, _: &str) {}
    fn repaired(&self, _: &ProfileRecord, _: bool, _: &str) {}
    fn folder(&self, _: &FolderReport<'_>) {}
    fn folder_removed(&self, _: &FolderRecord, _: RemovalTally) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: &RunSummary) {}
}
