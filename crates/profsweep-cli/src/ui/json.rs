//! JSON-lines report: one object per reporter event, tagged by `event`.

use profsweep_core::{
    FolderRecord, FolderReport, ProfileRecord, ProfileReport, RemovalTally, Reporter, RunSummary,
    Sid,
};
use serde::Serialize;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use tracing::warn;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Section {
        title: &'a str,
    },
    Profile(&'a ProfileReport<'a>),
    Removing {
        sid: &'a Sid,
    },
    Done {
        sid: &'a Sid,
        detail: &'a str,
    },
    Failed {
        sid: &'a Sid,
        reason: &'a str,
    },
    Repaired {
        sid: &'a Sid,
        success: bool,
        detail: &'a str,
    },
    Folder(&'a FolderReport<'a>),
    FolderRemoved {
        path: &'a Path,
        #[serde(flatten)]
        tally: RemovalTally,
    },
    Info {
        message: &'a str,
    },
    Warning {
        message: &'a str,
    },
    Error {
        message: &'a str,
    },
    Summary(&'a RunSummary),
}

/// Writes reporter events as JSON lines.
#[derive(Debug)]
pub struct JsonLines<W: Write> {
    out: RefCell<W>,
}

impl JsonLines<io::Stdout> {
    /// Report to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLines<W> {
    /// Report to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn emit(&self, event: &Event<'_>) {
        let mut out = self.out.borrow_mut();
        let written = serde_json::to_writer(&mut *out, event)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to write report line");
        }
    }
}

impl<W: Write> Reporter for JsonLines<W> {
    fn section(&self, title: &str) {
        self.emit(&Event::Section { title });
    }

    fn profile(&self, report: &ProfileReport<'_>) {
        self.emit(&Event::Profile(report));
    }

    fn removing(&self, record: &ProfileRecord) {
        self.emit(&Event::Removing { sid: &record.sid });
    }

    fn done(&self, record: &ProfileRecord, detail: &str) {
        self.emit(&Event::Done {
            sid: &record.sid,
            detail,
        });
    }

    fn failed(&self, record: &ProfileRecord, reason: &str) {
        self.emit(&Event::Failed {
            sid: &record.sid,
            reason,
        });
    }

    fn repaired(&self, record: &ProfileRecord, success: bool, detail: &str) {
        self.emit(&Event::Repaired {
            sid: &record.sid,
            success,
            detail,
        });
    }

    fn folder(&self, report: &FolderReport<'_>) {
        self.emit(&Event::Folder(report));
    }

    fn folder_removed(&self, folder: &FolderRecord, tally: RemovalTally) {
        self.emit(&Event::FolderRemoved {
            path: &folder.path,
            tally,
        });
    }

    fn info(&self, message: &str) {
        self.emit(&Event::Info { message });
    }

    fn warning(&self, message: &str) {
        self.emit(&Event::Warning { message });
    }

    fn error(&self, message: &str) {
        self.emit(&Event::Error { message });
    }

    fn summary(&self, summary: &RunSummary) {
        self.emit(&Event::Summary(summary));
    }
}
