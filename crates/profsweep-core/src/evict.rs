//! Eviction orchestration.
//!
//! [`Sweeper`] drives one run: classify every record of the working set,
//! report it, delete the deletable ones when cleanup is enabled, then reconcile
//! the users root against the same working set and deal with orphan folders.
//!
//! Listing runs go newest-first so the most recently used profiles are at the
//! top. Destructive runs go oldest-first so an interrupted run has already
//! removed the most clearly stale profiles. Nothing here aborts the run: a
//! failed delete is reported and the next record is processed.

use crate::classify::{Classification, Classifier, Disposition};
use crate::config::Config;
use crate::directory::WorkingSet;
use crate::fs::Filesystem;
use crate::orphan::{FolderVerdict, OrphanReconciler};
use crate::reporter::{FolderReport, ProfileReport, Reporter, RunSummary};
use crate::store::ProfileStore;
use crate::time::FileTime;
use crate::types::ProfileRecord;
use std::cmp::Reverse;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Runs the profile and orphan passes over one working set.
pub struct Sweeper<'a> {
    config: &'a Config,
    store: &'a dyn ProfileStore,
    fs: &'a dyn Filesystem,
    reporter: &'a dyn Reporter,
    now: FileTime,
}

impl fmt::Debug for Sweeper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sweeper")
            .field("config", &self.config)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl<'a> Sweeper<'a> {
    /// A sweeper that reads the clock once, at construction.
    pub fn new(
        config: &'a Config,
        store: &'a dyn ProfileStore,
        fs: &'a dyn Filesystem,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            store,
            fs,
            reporter,
            now: FileTime::now(),
        }
    }

    /// Use a fixed clock reading instead of the current time.
    pub fn at(mut self, now: FileTime) -> Self {
        self.now = now;
        self
    }

    /// Classify every record and order the result for this run's mode.
    pub fn plan<'s>(&self, set: &'s WorkingSet) -> Vec<(&'s ProfileRecord, Classification)> {
        let classifier = Classifier::new(self.config, self.store, self.now);
        let mut plan: Vec<_> = set
            .records()
            .iter()
            .map(|record| (record, classifier.classify(record)))
            .collect();

        if self.config.deletes_profiles() {
            plan.sort_by(|(ra, ca), (rb, cb)| {
                ca.effective_load
                    .cmp(&cb.effective_load)
                    .then_with(|| ra.sid.cmp(&rb.sid))
            });
        } else {
            plan.sort_by_key(|(record, c)| (Reverse(c.effective_load), record.sid.clone()));
        }
        plan
    }

    /// Run both passes and report the totals.
    pub fn run(&self, set: &WorkingSet) -> RunSummary {
        let mut summary = RunSummary {
            dropped: set.dropped().len(),
            ..RunSummary::default()
        };
        for dropped in set.dropped() {
            self.reporter.warning(&dropped.to_string());
        }
        if self.config.treat_unclean_as_old {
            self.reporter
                .info("profiles with an unclean shutdown count as infinitely old");
        }

        self.sweep_profiles(set, &mut summary);
        self.sweep_orphans(set, &mut summary);

        self.reporter.summary(&summary);
        summary
    }

    fn sweep_profiles(&self, set: &WorkingSet, summary: &mut RunSummary) {
        self.reporter.section("Profiles");

        for (record, classification) in self.plan(set) {
            if self.is_hidden(classification.disposition) {
                continue;
            }

            let size = self
                .sizes_wanted(&record.image_path)
                .then(|| self.fs.directory_size(Path::new(&record.image_path)));
            self.reporter.profile(&ProfileReport {
                record,
                classification,
                size,
            });
            summary.listed += 1;

            if !classification.disposition.is_deletable() {
                continue;
            }
            summary.candidates += 1;

            if self.config.deletes_profiles() {
                self.evict(record, summary);
            } else if self.config.perform_cleanup {
                self.reporter.done(record, "(dry run)");
            }
        }
    }

    fn evict(&self, record: &ProfileRecord, summary: &mut RunSummary) {
        self.reporter.removing(record);
        info!(sid = %record.sid, path = %record.image_path, "deleting profile");

        match self.store.delete(&record.sid) {
            Ok(()) => {
                summary.deleted += 1;
                self.reporter.done(record, "deleted");
            }
            Err(e) => {
                warn!(sid = %record.sid, error = %e, "profile delete failed");
                summary.failed += 1;
                self.reporter.failed(record, &e.to_string());

                if self.config.attempt_repair {
                    match self.store.repair(record) {
                        Ok(()) => {
                            summary.repaired += 1;
                            self.reporter
                                .repaired(record, true, "registry values restored for retry");
                        }
                        Err(e) => {
                            warn!(sid = %record.sid, error = %e, "registry repair failed");
                            self.reporter.repaired(record, false, &e.to_string());
                        }
                    }
                }
            }
        }
    }

    fn sweep_orphans(&self, set: &WorkingSet, summary: &mut RunSummary) {
        self.reporter.section("Orphan folders");

        let root = &self.config.users_root;
        if !self.fs.exists(root) {
            self.reporter.warning(&format!(
                "users root {} does not exist, skipping orphan scan",
                root.display()
            ));
            return;
        }

        let folders = match self.fs.list_directories(root) {
            Ok(folders) => folders,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "cannot list users root");
                self.reporter
                    .warning(&format!("cannot list {}: {e}", root.display()));
                return;
            }
        };

        // With no records at all every folder would look orphaned.
        let may_remove = self.config.deletes_orphans() && !set.is_empty();
        if self.config.deletes_orphans() && set.is_empty() {
            self.reporter
                .warning("no profile records found, orphan folders will not be removed");
        }

        // Entries that failed to parse still own their folders.
        let reconciler = OrphanReconciler::new(set.owner_paths());
        for (folder, verdict) in reconciler.reconcile(&folders) {
            if verdict != FolderVerdict::Orphan {
                if self.config.verbose {
                    self.reporter.folder(&FolderReport {
                        folder,
                        verdict,
                        size: None,
                    });
                }
                continue;
            }

            summary.orphans += 1;
            let size = self
                .config
                .show_sizes
                .then(|| self.fs.directory_size(&folder.path));
            self.reporter.folder(&FolderReport {
                folder,
                verdict,
                size,
            });

            if may_remove {
                info!(path = %folder.path.display(), "removing orphan folder");
                let tally = self.fs.delete_recursive(&folder.path);
                summary.orphan_entries += tally;
                if tally.is_complete() {
                    summary.orphans_removed += 1;
                }
                self.reporter.folder_removed(folder, tally);
            }
        }
    }

    fn is_hidden(&self, disposition: Disposition) -> bool {
        match disposition {
            Disposition::NoImagePath => self.config.hide_missing_path,
            Disposition::NoLoadTime => self.config.hide_never_loaded,
            _ => false,
        }
    }

    fn sizes_wanted(&self, image_path: &str) -> bool {
        self.config.show_sizes && !image_path.is_empty()
    }
}
