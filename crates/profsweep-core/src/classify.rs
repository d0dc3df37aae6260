//! Profile classification.
//!
//! Each record gets exactly one [`Disposition`] from an ordered decision table.
//! Later rules only see records that every earlier rule let through, so the
//! order of [`RULES`] is the policy:
//!
//! | # | rule             | disposition                         |
//! |---|------------------|-------------------------------------|
//! | 1 | system account   | `AdminExempt`                       |
//! | 2 | no image path    | `NoImagePath`                       |
//! | 3 | never loaded     | `NoLoadTime`                        |
//! | 4 | within window    | `Preserved`                         |
//! | 5 | skiplisted       | `SkiplistExempt`                    |
//! | 6 | loaded           | `LoadedExempt`                      |
//! | - | (fallthrough)    | `UncleanShutdown` / `EvictionCandidate` |
//!
//! Before the table runs, an unclean shutdown (unload earlier than load) is
//! detected. Under the dirty policy the record's effective load instant becomes
//! the epoch, which makes it older than any retention window.

use crate::config::Config;
use crate::store::ProfileStore;
use crate::time::{FileTime, age_in_days, is_unclean};
use crate::types::ProfileRecord;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// The single decision for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// System/service account, or the built-in Administrator. Never deleted.
    AdminExempt,
    /// Listed in the skiplist. Never deleted.
    SkiplistExempt,
    /// Currently loaded (or its state is unknown). Never deleted.
    LoadedExempt,
    /// No `ProfileImagePath`.
    NoImagePath,
    /// Never loaded.
    NoLoadTime,
    /// Stale because the dirty policy forced its effective load instant back.
    UncleanShutdown(FileTime),
    /// Loaded within the retention window.
    Preserved,
    /// Stale and unprotected.
    EvictionCandidate,
}

impl Disposition {
    /// Whether the orchestrator may delete a record with this disposition.
    pub fn is_deletable(self) -> bool {
        matches!(self, Self::EvictionCandidate | Self::UncleanShutdown(_))
    }

    /// Permanently protected dispositions.
    pub fn is_exempt(self) -> bool {
        matches!(
            self,
            Self::AdminExempt | Self::SkiplistExempt | Self::LoadedExempt
        )
    }

    /// Short label for reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::AdminExempt => "admin-exempt",
            Self::SkiplistExempt => "skiplisted",
            Self::LoadedExempt => "loaded",
            Self::NoImagePath => "no-image-path",
            Self::NoLoadTime => "never-loaded",
            Self::UncleanShutdown(_) => "stale (dirty)",
            Self::Preserved => "preserved",
            Self::EvictionCandidate => "stale",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A disposition plus the facts that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// The decision.
    pub disposition: Disposition,
    /// The unload instant precedes the load instant.
    pub unclean: bool,
    /// Load instant used for the age check and for ordering.
    pub effective_load: FileTime,
    /// Days since `effective_load`, rounded up.
    pub age_days: i64,
}

/// Per-record facts computed before the decision table runs.
#[derive(Debug)]
struct Facts<'r> {
    record: &'r ProfileRecord,
    unclean: bool,
    forced_old: bool,
    effective_load: FileTime,
}

type Rule = fn(&Classifier<'_>, &Facts<'_>) -> Option<Disposition>;

/// The decision table, in evaluation order.
const RULES: [(&str, Rule); 6] = [
    ("system-account", rule_system_account),
    ("no-image-path", rule_no_image_path),
    ("never-loaded", rule_never_loaded),
    ("retention-window", rule_retention_window),
    ("skiplist", rule_skiplist),
    ("loaded", rule_loaded),
];

fn rule_system_account(c: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    let sid = &f.record.sid;
    let protected =
        sid.is_system_account() || (sid.is_builtin_administrator() && !c.config.include_admin);
    protected.then_some(Disposition::AdminExempt)
}

fn rule_no_image_path(_: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    f.record
        .image_path
        .is_empty()
        .then_some(Disposition::NoImagePath)
}

fn rule_never_loaded(_: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    f.record.load.is_zero().then_some(Disposition::NoLoadTime)
}

fn rule_retention_window(c: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    (f.effective_load >= c.threshold).then_some(Disposition::Preserved)
}

fn rule_skiplist(c: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    c.config
        .skiplist
        .contains(&f.record.sid)
        .then_some(Disposition::SkiplistExempt)
}

fn rule_loaded(c: &Classifier<'_>, f: &Facts<'_>) -> Option<Disposition> {
    let loaded = c.store.is_loaded(&f.record.sid).unwrap_or_else(|e| {
        warn!(sid = %f.record.sid, error = %e, "loaded-state unknown, assuming loaded");
        true
    });
    loaded.then_some(Disposition::LoadedExempt)
}

/// Classifies records against one configuration and one clock reading.
pub struct Classifier<'a> {
    config: &'a Config,
    store: &'a dyn ProfileStore,
    now: FileTime,
    threshold: FileTime,
}

impl fmt::Debug for Classifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("now", &self.now)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl<'a> Classifier<'a> {
    /// Fix the clock and derive the preservation threshold
    /// (`now - retention_days`; equal to `now` for a zero-day window).
    pub fn new(config: &'a Config, store: &'a dyn ProfileStore, now: FileTime) -> Self {
        Self {
            config,
            store,
            now,
            threshold: now.minus_days(config.retention_days),
        }
    }

    /// Run the decision table for one record.
    pub fn classify(&self, record: &ProfileRecord) -> Classification {
        let unclean = is_unclean(record.load, record.unload);
        let forced_old = unclean && self.config.treat_unclean_as_old;
        let facts = Facts {
            record,
            unclean,
            forced_old,
            effective_load: if forced_old {
                FileTime::ZERO
            } else {
                record.load
            },
        };

        let (rule, disposition) = RULES
            .iter()
            .find_map(|(name, rule)| rule(self, &facts).map(|d| (*name, d)))
            .unwrap_or_else(|| {
                let d = if facts.forced_old {
                    Disposition::UncleanShutdown(facts.effective_load)
                } else {
                    Disposition::EvictionCandidate
                };
                ("fallthrough", d)
            });

        debug!(sid = %record.sid, rule, %disposition, unclean, "classified");

        Classification {
            disposition,
            unclean: facts.unclean,
            effective_load: facts.effective_load,
            age_days: age_in_days(self.now, facts.effective_load),
        }
    }
}

/// Classify a single record.
pub fn classify(
    record: &ProfileRecord,
    config: &Config,
    now: FileTime,
    store: &dyn ProfileStore,
) -> Classification {
    Classifier::new(config, store, now).classify(record)
}
