//! profsweep core
//!
//! Inventories local user profiles, reconciles them against the folders under
//! the users root, and decides which stale profiles and orphan folders may be
//! removed.
//!
//! # Architecture
//!
//! ```text
//! ProfileDirectory ──► WorkingSet ──► Classifier ──► Sweeper ──► ProfileStore
//!                           │                          │
//!                           └──► OrphanReconciler ─────┴──────► Filesystem
//! ```
//!
//! - **Seams**: [`ProfileDirectory`], [`ProfileStore`] and [`Filesystem`] are
//!   traits; [`windows::WindowsProfiles`], [`snapshot::SnapshotInventory`] and
//!   [`fs::LocalFilesystem`] implement them.
//! - **Decision table**: [`Classifier`] runs an ordered rule list and returns the
//!   first matching [`Disposition`].
//! - **Reporting**: the orchestrator talks to a [`Reporter`] so the CLI can
//!   render for humans or emit JSON lines.
#![allow(clippy::missing_errors_doc)]

pub mod classify;
pub mod config;
pub mod directory;
pub mod evict;
pub mod fs;
pub mod orphan;
pub mod reporter;
pub mod sid;
pub mod snapshot;
pub mod store;
pub mod time;
pub mod types;
pub mod windows;

pub use classify::{Classification, Classifier, Disposition, classify};
pub use config::{Config, ConfigError, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS, Skiplist};
pub use directory::{DirectoryError, ProfileDirectory, WorkingSet};
pub use evict::Sweeper;
pub use fs::{Filesystem, LocalFilesystem, RemovalTally};
pub use orphan::{FolderVerdict, OrphanReconciler};
pub use reporter::{FolderReport, NullReporter, ProfileReport, Reporter, RunSummary};
pub use sid::Sid;
pub use store::{ProfileStore, StoreError};
pub use time::FileTime;
pub use types::{FolderRecord, ProfileRecord, RawProfileEntry};
