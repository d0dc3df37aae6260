//! Human-readable report.
//!
//! Every reporter event becomes one or two styled lines on stdout. Lines are
//! built by the `*_line` helpers so they can be checked without a terminal.

use super::theme::{Theme, format_size, truncate};
use crossterm::style::Stylize;
use profsweep_core::{
    FolderRecord, FolderReport, ProfileRecord, ProfileReport, RemovalTally, Reporter, RunSummary,
};

/// Terminal reporter.
#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
}

impl Output {
    /// Create a new output handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Header line followed by a rule.
    pub fn section_line(&self, title: &str) -> String {
        format!(
            "{} {}",
            title.bold(),
            "─"
                .repeat(self.theme.layout.rule_width)
                .with(self.theme.colors.header)
        )
    }

    /// The two lines describing one profile.
    pub fn profile_lines(&self, report: &ProfileReport<'_>) -> (String, String) {
        let theme = &self.theme;
        let layout = &theme.layout;
        let c = &report.classification;
        let record = report.record;

        let age = if c.effective_load.is_zero() {
            "-".to_string()
        } else {
            format!("{}d", c.age_days)
        };
        let color = theme.disposition_color(c.disposition);

        let head = format!(
            "{} {} {} {} {}",
            theme.disposition_icon(c.disposition).with(color),
            format!("{:<w$}", record.sid.to_string(), w = layout.sid_width).with(theme.colors.primary),
            format!(
                "{:<w$}",
                truncate(record.display_name(), layout.name_width),
                w = layout.name_width
            )
            .with(theme.colors.name),
            format!("{age:>w$}", w = layout.age_width),
            format!("{:<w$}", c.disposition.label(), w = layout.verdict_width).with(color),
        );

        let mut detail = format!(
            "  {}  load {}  unload {}",
            if record.image_path.is_empty() {
                "(no image path)"
            } else {
                record.image_path.as_str()
            },
            record.load,
            record.unload,
        );
        if c.unclean {
            detail.push_str("  unclean shutdown");
        }
        if let Some(size) = report.size {
            detail.push_str(&format!("  {}", format_size(size)));
        }

        (head, detail.with(theme.colors.secondary).to_string())
    }

    /// The line describing one folder.
    pub fn folder_line(&self, report: &FolderReport<'_>) -> String {
        let theme = &self.theme;
        let verdict = format!("{:?}", report.verdict).to_lowercase();
        let mut line = format!(
            "{} {} {}",
            format!("{verdict:<9}").with(theme.verdict_color(report.verdict)),
            report.folder.name.as_str().with(theme.colors.primary),
            report
                .folder
                .path
                .display()
                .to_string()
                .with(theme.colors.secondary),
        );
        if let Some(size) = report.size {
            line.push_str(&format!("  {}", format_size(size)));
        }
        line
    }

    /// Closing totals.
    pub fn summary_lines(&self, s: &RunSummary) -> Vec<String> {
        let mut lines = vec![format!(
            "{} profile{} listed, {} stale, {} deleted, {} failed",
            s.listed,
            plural(s.listed),
            s.candidates,
            s.deleted,
            s.failed,
        )];
        if s.repaired > 0 {
            lines.push(format!("{} registry repair{}", s.repaired, plural(s.repaired)));
        }
        if s.dropped > 0 {
            lines.push(format!(
                "{} unusable profile entr{} skipped",
                s.dropped,
                if s.dropped == 1 { "y" } else { "ies" }
            ));
        }
        lines.push(format!(
            "{} orphan folder{}, {} removed ({} entries removed, {} left)",
            s.orphans,
            plural(s.orphans),
            s.orphans_removed,
            s.orphan_entries.removed,
            s.orphan_entries.failed,
        ));
        lines
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        println!();
        println!("{}", self.section_line(title));
    }

    fn profile(&self, report: &ProfileReport<'_>) {
        let (head, detail) = self.profile_lines(report);
        println!("{head}");
        println!("{detail}");
    }

    fn removing(&self, record: &ProfileRecord) {
        println!(
            "  {} removing {}",
            self.theme.icons.active.with(self.theme.colors.stale),
            record.sid
        );
    }

    fn done(&self, record: &ProfileRecord, detail: &str) {
        println!(
            "  {} {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            record.sid,
            detail.with(self.theme.colors.secondary)
        );
    }

    fn failed(&self, record: &ProfileRecord, reason: &str) {
        println!(
            "  {} {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            record.sid,
            reason.with(self.theme.colors.error)
        );
    }

    fn repaired(&self, record: &ProfileRecord, success: bool, detail: &str) {
        let (icon, color) = if success {
            (self.theme.icons.success, self.theme.colors.success)
        } else {
            (self.theme.icons.error, self.theme.colors.error)
        };
        println!(
            "  {} repair {} {}",
            icon.with(color),
            record.sid,
            detail.with(self.theme.colors.secondary)
        );
    }

    fn folder(&self, report: &FolderReport<'_>) {
        println!("{}", self.folder_line(report));
    }

    fn folder_removed(&self, folder: &FolderRecord, tally: RemovalTally) {
        if tally.is_complete() {
            println!(
                "  {} removed {} ({} entries)",
                self.theme.icons.success.with(self.theme.colors.success),
                folder.path.display(),
                tally.removed
            );
        } else {
            println!(
                "  {} partially removed {} ({} entries removed, {} left)",
                self.theme.icons.warning.with(self.theme.colors.warning),
                folder.path.display(),
                tally.removed,
                tally.failed
            );
        }
    }

    fn info(&self, msg: &str) {
        println!("{} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
    }

    fn warning(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }

    fn summary(&self, summary: &RunSummary) {
        println!();
        for line in self.summary_lines(summary) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profsweep_core::{Classification, Disposition, FileTime, FolderVerdict, Sid};
    use std::path::PathBuf;

    fn record(path: &str) -> ProfileRecord {
        ProfileRecord {
            sid: "S-1-5-21-1-2-3-1001".parse::<Sid>().unwrap(),
            friendly_name: Some(r"HOST\alice".to_string()),
            image_path: path.to_string(),
            load: FileTime::from_ticks(133_000_000_000_000_000),
            unload: FileTime::ZERO,
        }
    }

    #[test]
    fn test_profile_lines() {
        let output = Output::new();
        let record = record(r"C:\Users\alice");
        let report = ProfileReport {
            record: &record,
            classification: Classification {
                disposition: Disposition::EvictionCandidate,
                unclean: true,
                effective_load: record.load,
                age_days: 200,
            },
            size: Some(2048),
        };

        let (head, detail) = output.profile_lines(&report);
        assert!(head.contains("S-1-5-21-1-2-3-1001"));
        assert!(head.contains(r"HOST\alice"));
        assert!(head.contains("200d"));
        assert!(head.contains("stale"));
        assert!(detail.contains(r"C:\Users\alice"));
        assert!(detail.contains("unload never"));
        assert!(detail.contains("unclean shutdown"));
        assert!(detail.contains("2.0 KB"));
    }

    #[test]
    fn test_never_loaded_has_no_age() {
        let output = Output::new();
        let mut record = record("");
        record.load = FileTime::ZERO;
        let report = ProfileReport {
            record: &record,
            classification: Classification {
                disposition: Disposition::NoImagePath,
                unclean: false,
                effective_load: FileTime::ZERO,
                age_days: 0,
            },
            size: None,
        };

        let (head, detail) = output.profile_lines(&report);
        assert!(head.contains(" - "));
        assert!(head.contains("no-image-path"));
        assert!(detail.contains("(no image path)"));
    }

    #[test]
    fn test_folder_line() {
        let output = Output::new();
        let folder = FolderRecord::from_path(PathBuf::from("/users/carol"));
        let line = output.folder_line(&FolderReport {
            folder: &folder,
            verdict: FolderVerdict::Orphan,
            size: None,
        });
        assert!(line.contains("orphan"));
        assert!(line.contains("carol"));
    }

    #[test]
    fn test_summary_lines() {
        let output = Output::new();
        let lines = output.summary_lines(&RunSummary {
            listed: 1,
            candidates: 1,
            deleted: 1,
            dropped: 2,
            orphans: 3,
            orphans_removed: 2,
            orphan_entries: RemovalTally {
                removed: 10,
                failed: 1,
            },
            ..RunSummary::default()
        });
        assert_eq!(lines[0], "1 profile listed, 1 stale, 1 deleted, 0 failed");
        assert_eq!(lines[1], "2 unusable profile entries skipped");
        assert_eq!(
            lines[2],
            "3 orphan folders, 2 removed (10 entries removed, 1 left)"
        );
    }
}
