//! profsweep - stale profile and orphan folder cleanup
//!
//! Lists local user profiles with their real last-use date (taken from the
//! profile list's load/unload timestamps, not the folder's modification time),
//! and optionally deletes the stale ones together with home folders that no
//! longer belong to any profile.
//!
//! Nothing is deleted unless `--cleanup`, `--orphans` or `--all` is given.
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cmd;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use profsweep_core::{MAX_RETENTION_DAYS, Sid};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "profsweep")]
#[command(author, version, about = "profsweep - stale profile and orphan folder cleanup")]
pub struct Cli {
    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit one JSON object per line instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List profiles and orphan folders, optionally removing stale ones
    Scan(ScanArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Preserve profiles loaded within this many days (0 preserves none by age)
    #[arg(
        long,
        short = 'd',
        env = "PROFSWEEP_DAYS",
        default_value_t = profsweep_core::DEFAULT_RETENTION_DAYS,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETENTION_DAYS)),
    )]
    pub days: u32,

    /// Apply the normal rules to the built-in Administrator profile
    #[arg(long)]
    pub include_admin: bool,

    /// Delete stale profiles
    #[arg(long)]
    pub cleanup: bool,

    /// Shortcut for --cleanup --orphans
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Treat profiles with an unclean shutdown as infinitely old
    #[arg(long)]
    pub dirty: bool,

    /// Delete orphan folders under the users root
    #[arg(long)]
    pub orphans: bool,

    /// Restore Flags/State/ProfileImagePath when a delete fails, so a later run can retry
    #[arg(long)]
    pub repair: bool,

    /// Do not list profiles that were never loaded
    #[arg(long)]
    pub hide_never_loaded: bool,

    /// Do not list profiles without an image path
    #[arg(long)]
    pub hide_missing_path: bool,

    /// Also list owned and excluded folders
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Measure profile and orphan folder sizes
    #[arg(long)]
    pub sizes: bool,

    /// Additional SIDs that must never be deleted
    #[arg(long = "skip", value_name = "SID")]
    pub skip: Vec<Sid>,

    /// Directory holding profile folders [default: ProfilesDirectory of the profile list]
    #[arg(long, env = "PROFSWEEP_USERS_ROOT")]
    pub users_root: Option<PathBuf>,

    /// Read profiles from a JSON inventory instead of the live registry
    #[arg(long, env = "PROFSWEEP_INVENTORY", value_name = "FILE")]
    pub inventory: Option<PathBuf>,

    /// Skip the confirmation prompt for destructive runs
    #[arg(long, short = 'y')]
    pub yes: bool,
}
