//! UI Theme - Design system constants
//!
//! Colors, icons and column widths used by the human-readable report.

use crossterm::style::Color;
use profsweep_core::{Disposition, FolderVerdict};

/// Default theme for the report
#[derive(Debug, Clone, Default)]
pub struct Theme {
    /// Colors for different UI elements
    pub colors: ColorScheme,
    /// Status icons
    pub icons: Icons,
    /// Column widths
    pub layout: Layout,
}

impl Theme {
    /// Color for a profile verdict.
    pub fn disposition_color(&self, disposition: Disposition) -> Color {
        match disposition {
            Disposition::EvictionCandidate | Disposition::UncleanShutdown(_) => self.colors.stale,
            Disposition::NoImagePath | Disposition::NoLoadTime => self.colors.warning,
            Disposition::Preserved => self.colors.success,
            Disposition::AdminExempt | Disposition::SkiplistExempt | Disposition::LoadedExempt => {
                self.colors.secondary
            }
        }
    }

    /// Icon for a profile verdict.
    pub fn disposition_icon(&self, disposition: Disposition) -> &'static str {
        if disposition.is_deletable() {
            self.icons.active
        } else if disposition.is_exempt() {
            self.icons.pending
        } else if matches!(disposition, Disposition::Preserved) {
            self.icons.success
        } else {
            self.icons.warning
        }
    }

    /// Color for a folder verdict.
    pub fn verdict_color(&self, verdict: FolderVerdict) -> Color {
        match verdict {
            FolderVerdict::Orphan => self.colors.stale,
            FolderVerdict::Owned => self.colors.success,
            FolderVerdict::Excluded => self.colors.secondary,
        }
    }
}

/// Color scheme for UI elements
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// SIDs and folder names (primary content)
    pub primary: Color,
    /// Account names
    pub name: Color,
    /// Paths, dates and secondary info
    pub secondary: Color,
    /// Section headers
    pub header: Color,
    /// Success states
    pub success: Color,
    /// Warning states
    pub warning: Color,
    /// Error states
    pub error: Color,
    /// Deletable profiles and orphan folders
    pub stale: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            name: Color::White,
            secondary: Color::DarkGrey,
            header: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            stale: Color::Red,
        }
    }
}

/// Status icons for different states
#[derive(Debug, Clone)]
pub struct Icons {
    /// Exempt state (○)
    pub pending: &'static str,
    /// Deletable state (●)
    pub active: &'static str,
    /// Success/completed state (✓)
    pub success: &'static str,
    /// Error/failed state (✗)
    pub error: &'static str,
    /// Warning state (⚠)
    pub warning: &'static str,
    /// Info state (ℹ)
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            pending: "○",
            active: "●",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}

/// Column widths
#[derive(Debug, Clone)]
pub struct Layout {
    /// Width allocated for the SID column
    pub sid_width: usize,
    /// Width allocated for the account name column
    pub name_width: usize,
    /// Width allocated for the age column
    pub age_width: usize,
    /// Width allocated for the verdict column
    pub verdict_width: usize,
    /// Width of section rules
    pub rule_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sid_width: 46,
            name_width: 24,
            age_width: 6,
            verdict_width: 14,
            rule_width: 40,
        }
    }
}

/// Format bytes for human-readable display
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Truncate `text` to `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use profsweep_core::FileTime;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 5), "5.0 MB");
    }

    #[test]
    fn test_format_size_gigabytes() {
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("alice", 10), "alice");
        assert_eq!(truncate("CONTOSO\\averylongname", 8), "CONTOSO…");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_disposition_styling() {
        let theme = Theme::default();
        assert_eq!(
            theme.disposition_color(Disposition::EvictionCandidate),
            Color::Red
        );
        assert_eq!(
            theme.disposition_color(Disposition::UncleanShutdown(FileTime::ZERO)),
            Color::Red
        );
        assert_eq!(theme.disposition_color(Disposition::Preserved), Color::Green);
        assert_eq!(theme.disposition_icon(Disposition::LoadedExempt), "○");
        assert_eq!(theme.disposition_icon(Disposition::NoLoadTime), "⚠");
        assert_eq!(theme.verdict_color(FolderVerdict::Orphan), Color::Red);
    }
}
