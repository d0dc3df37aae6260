//! Run configuration.
//!
//! A [`Config`] is assembled once from the command line, validated, and then
//! only read. The skiplist is part of it so that classification needs no other
//! input besides the record, the clock, and the store.

use crate::sid::Sid;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// Largest accepted retention window; effectively "preserve everything".
pub const MAX_RETENTION_DAYS: u32 = 9999;

/// Relative identifiers of built-in accounts that are never evicted:
/// Guest, DefaultAccount, WDAGUtilityAccount.
const SKIPLISTED_RIDS: [u32; 3] = [501, 503, 504];

/// A configuration that cannot be run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `retention_days` is above [`MAX_RETENTION_DAYS`].
    #[error("retention window of {0} days is out of range (0..={MAX_RETENTION_DAYS})")]
    RetentionOutOfRange(u32),
}

/// SIDs that are permanently exempt from eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skiplist {
    rids: BTreeSet<u32>,
    sids: BTreeSet<Sid>,
}

impl Default for Skiplist {
    fn default() -> Self {
        Self {
            rids: SKIPLISTED_RIDS.into_iter().collect(),
            sids: BTreeSet::new(),
        }
    }
}

impl Skiplist {
    /// The built-in skiplist extended with exact SIDs.
    pub fn with_sids(sids: impl IntoIterator<Item = Sid>) -> Self {
        Self {
            sids: sids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Whether `sid` is exempt.
    pub fn contains(&self, sid: &Sid) -> bool {
        self.sids.contains(sid) || (sid.is_account() && self.rids.contains(&sid.rid()))
    }
}

/// Everything that shapes a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Profiles loaded within this many days are preserved. Zero preserves nothing by age.
    pub retention_days: u32,
    /// Subject the built-in Administrator profile to the normal rules.
    pub include_admin: bool,
    /// Delete eviction candidates.
    pub perform_cleanup: bool,
    /// Treat profiles with an unclean shutdown as infinitely old.
    pub treat_unclean_as_old: bool,
    /// Suppress report lines for profiles that were never loaded.
    pub hide_never_loaded: bool,
    /// Suppress report lines for profiles without an image path.
    pub hide_missing_path: bool,
    /// Delete orphan folders under the users root.
    pub remove_orphans: bool,
    /// Restore the registry values a failed delete depends on.
    pub attempt_repair: bool,
    /// Report excluded folders and extra annotations.
    pub verbose: bool,
    /// Report destructive actions without performing them.
    pub dry_run: bool,
    /// Measure profile and orphan folder sizes.
    pub show_sizes: bool,
    /// Directory holding profile folders (`C:\Users`).
    pub users_root: PathBuf,
    /// Exempt identifiers.
    pub skiplist: Skiplist,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            include_admin: false,
            perform_cleanup: false,
            treat_unclean_as_old: false,
            hide_never_loaded: false,
            hide_missing_path: false,
            remove_orphans: false,
            attempt_repair: false,
            verbose: false,
            dry_run: false,
            show_sizes: false,
            users_root: PathBuf::from(r"C:\Users"),
            skiplist: Skiplist::default(),
        }
    }
}

impl Config {
    /// Force profile cleanup and orphan removal on.
    pub fn with_aggressive_cleanup(mut self) -> Self {
        self.perform_cleanup = true;
        self.remove_orphans = true;
        self
    }

    /// Check ranges. Call once, before any processing.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::RetentionOutOfRange(self.retention_days));
        }
        Ok(self)
    }

    /// Whether profile deletions will actually happen.
    pub fn deletes_profiles(&self) -> bool {
        self.perform_cleanup && !self.dry_run
    }

    /// Whether orphan folders will actually be removed.
    pub fn deletes_orphans(&self) -> bool {
        self.remove_orphans && !self.dry_run
    }
}
