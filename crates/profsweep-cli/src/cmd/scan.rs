//! Scan command
use crate::ScanArgs;
use crate::ui::{JsonLines, Output};
use anyhow::{Context, Result, bail};
use crossterm::style::Stylize;
use profsweep_core::snapshot::SnapshotInventory;
use profsweep_core::windows::WindowsProfiles;
use profsweep_core::{
    Config, LocalFilesystem, ProfileDirectory, ProfileStore, Reporter, Skiplist, Sweeper,
    WorkingSet,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where profile records come from and where deletions go.
enum Backend {
    Snapshot(SnapshotInventory),
    Live(WindowsProfiles),
}

impl Backend {
    fn open(inventory: Option<&Path>) -> Result<Self> {
        if let Some(path) = inventory {
            let snapshot = SnapshotInventory::open(path)
                .with_context(|| format!("Failed to open inventory {}", path.display()))?;
            return Ok(Self::Snapshot(snapshot));
        }
        if !cfg!(windows) {
            bail!("the live profile list is only available on Windows; pass --inventory FILE");
        }
        let live = WindowsProfiles::new().context("Failed to locate reg.exe/powershell.exe")?;
        Ok(Self::Live(live))
    }

    fn directory(&self) -> &dyn ProfileDirectory {
        match self {
            Self::Snapshot(s) => s,
            Self::Live(l) => l,
        }
    }

    fn store(&self) -> &dyn ProfileStore {
        match self {
            Self::Snapshot(s) => s,
            Self::Live(l) => l,
        }
    }
}

/// How the users root was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    /// `--users-root` or `PROFSWEEP_USERS_ROOT`.
    Explicit,
    /// `ProfilesDirectory` of the profile list.
    ProfileList,
    /// `%SystemDrive%\Users`, or `C:\Users` without `SystemDrive`.
    Guessed,
}

/// Pick the users root: explicit flag, then the profile list, then a guess.
pub fn resolve_users_root(
    explicit: Option<&Path>,
    directory: &dyn ProfileDirectory,
    system_drive: Option<String>,
) -> (PathBuf, RootSource) {
    if let Some(root) = explicit {
        return (root.to_path_buf(), RootSource::Explicit);
    }
    match directory.profiles_directory() {
        Ok(Some(root)) => return (PathBuf::from(root), RootSource::ProfileList),
        Ok(None) => debug!("profile list has no ProfilesDirectory"),
        Err(e) => warn!(error = %e, "cannot read ProfilesDirectory"),
    }
    let guess = system_drive
        .map(|drive| drive.trim().to_string())
        .filter(|drive| !drive.is_empty())
        .map_or_else(
            || Config::default().users_root,
            |drive| PathBuf::from(format!(r"{drive}\Users")),
        );
    (guess, RootSource::Guessed)
}

/// Build the run configuration from the command line.
pub fn build_config(args: &ScanArgs, dry_run: bool, users_root: PathBuf) -> Result<Config> {
    let mut config = Config {
        retention_days: args.days,
        include_admin: args.include_admin,
        perform_cleanup: args.cleanup,
        treat_unclean_as_old: args.dirty,
        hide_never_loaded: args.hide_never_loaded,
        hide_missing_path: args.hide_missing_path,
        remove_orphans: args.orphans,
        attempt_repair: args.repair,
        verbose: args.verbose,
        dry_run,
        show_sizes: args.sizes,
        users_root,
        skiplist: Skiplist::with_sids(args.skip.iter().cloned()),
    };
    if args.all {
        config = config.with_aggressive_cleanup();
    }
    Ok(config.validate()?)
}

/// List profiles and orphan folders, deleting what the flags allow
pub fn scan(args: &ScanArgs, dry_run: bool, json: bool) -> Result<()> {
    let reporter: Box<dyn Reporter> = if json {
        Box::new(JsonLines::stdout())
    } else {
        Box::new(Output::new())
    };

    let backend = Backend::open(args.inventory.as_deref())?;
    let (users_root, source) = resolve_users_root(
        args.users_root.as_deref(),
        backend.directory(),
        std::env::var("SystemDrive").ok(),
    );
    let mut config = build_config(args, dry_run, users_root)?;
    match source {
        RootSource::Explicit => {}
        RootSource::ProfileList => reporter.info(&format!(
            "users root {} (from the profile list)",
            config.users_root.display()
        )),
        RootSource::Guessed => {
            reporter.warning(&format!(
                "profile list has no ProfilesDirectory, assuming users root {}",
                config.users_root.display()
            ));
            if config.remove_orphans {
                reporter.warning(
                    "orphan folders are not removed under a guessed users root; pass --users-root",
                );
                config.remove_orphans = false;
            }
        }
    }
    debug!(?config, ?source, "scan configuration");

    let set = WorkingSet::load(backend.directory()).context("Failed to enumerate profiles")?;

    if (config.deletes_profiles() || config.deletes_orphans()) && !args.yes && !confirm(&config)?
    {
        reporter.error("Operation cancelled");
        return Ok(());
    }

    let summary =
        Sweeper::new(&config, backend.store(), &LocalFilesystem, reporter.as_ref()).run(&set);

    if summary.failed > 0 {
        bail!(
            "{} profile deletion{} failed",
            summary.failed,
            if summary.failed == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

/// Ask before anything is deleted. The prompt goes to stderr so JSON output stays parseable.
fn confirm(config: &Config) -> Result<bool> {
    let what = match (config.deletes_profiles(), config.deletes_orphans()) {
        (true, true) => "stale profiles and orphan folders",
        (true, false) => "stale profiles",
        _ => "orphan folders",
    };
    eprintln!();
    eprint!(
        "  {} This will permanently delete {what} under {}. Continue? (y/N) ",
        "WARNING:".bold().red(),
        config.users_root.display()
    );
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
