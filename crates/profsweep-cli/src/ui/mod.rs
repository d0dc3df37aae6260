//! Terminal and JSON-lines rendering of a run.
//!
//! # Modules
//!
//! - [`theme`] - Colors, icons, and column widths
//! - [`output`] - Styled human-readable report
//! - [`json`] - One JSON object per event for scripting

pub mod json;
pub mod output;
pub mod theme;

pub use json::JsonLines;
pub use output::Output;
pub use theme::Theme;
