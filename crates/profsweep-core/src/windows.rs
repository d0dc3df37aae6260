//! Live Windows adapters.
//!
//! The profile list is read with `reg.exe query` and parsed from its text
//! output; account names, loaded state and deletion go through
//! `Win32_UserProfile` via `powershell.exe`; repair writes values back with
//! `reg.exe add`. Each child process runs with its output redirected to temp
//! files and a hard timeout.

use crate::directory::{DirectoryError, ProfileDirectory};
use crate::sid::Sid;
use crate::store::{ProfileStore, StoreError};
use crate::types::{ProfileRecord, RawProfileEntry};
use base64::Engine;
use regex::{Captures, Regex};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// Registry key holding one subkey per profile.
pub const PROFILE_LIST_KEY: &str =
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList";

const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Profile deletion walks and removes the whole profile folder.
const DELETE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `    Name    REG_TYPE    Data` (data absent for empty values).
static VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(\S.*?)\s{4}(REG_[A-Z0-9_]+)(?:\s{4}(.*))?$").expect("static regex")
});

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%]+)%").expect("static regex"));

#[derive(Error, Debug)]
enum ToolError {
    #[error("{0} not found on PATH")]
    Missing(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Parse `reg.exe query <ProfileList> /s` output into raw entries.
///
/// Only direct subkeys of the profile list become entries; values of the
/// profile list key itself and of deeper subkeys are ignored.
pub fn parse_profile_list(output: &str) -> Vec<RawProfileEntry> {
    let mut entries = Vec::new();
    let mut current: Option<RawProfileEntry> = None;

    for line in output.lines().map(|l| l.trim_end_matches('\r')) {
        if line.starts_with("HKEY_") {
            entries.extend(current.take());
            current = line
                .rsplit_once('\\')
                .filter(|(parent, child)| {
                    parent.eq_ignore_ascii_case(PROFILE_LIST_KEY) && !child.is_empty()
                })
                .map(|(_, child)| RawProfileEntry {
                    key: child.to_string(),
                    ..RawProfileEntry::default()
                });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        let Some(caps) = VALUE_LINE.captures(line) else {
            continue;
        };
        let name = &caps[1];
        let data = caps.get(3).map_or("", |m| m.as_str()).trim();

        match name.to_ascii_lowercase().as_str() {
            "profileimagepath" => entry.image_path = data.to_string(),
            "localprofileloadtimehigh" => entry.load_high = parse_dword(data),
            "localprofileloadtimelow" => entry.load_low = parse_dword(data),
            "localprofileunloadtimehigh" => entry.unload_high = parse_dword(data),
            "localprofileunloadtimelow" => entry.unload_low = parse_dword(data),
            _ => {}
        }
    }

    entries.extend(current);
    entries
}

/// Parse `reg.exe query <ProfileList> /v ProfilesDirectory` output.
///
/// Only a value of the profile list key itself counts; an empty value is `None`.
pub fn parse_profiles_directory(output: &str) -> Option<String> {
    let mut in_profile_list = false;
    for line in output.lines().map(|l| l.trim_end_matches('\r')) {
        if line.starts_with("HKEY_") {
            in_profile_list = line.eq_ignore_ascii_case(PROFILE_LIST_KEY);
            continue;
        }
        if !in_profile_list {
            continue;
        }
        let Some(caps) = VALUE_LINE.captures(line) else {
            continue;
        };
        if caps[1].eq_ignore_ascii_case("ProfilesDirectory") {
            return caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|data| !data.is_empty());
        }
    }
    None
}

/// `0x1d9f3a2` as printed by `reg.exe`; anything unreadable is zero.
fn parse_dword(data: &str) -> u32 {
    let hex = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    u32::from_str_radix(hex, 16).unwrap_or(0)
}

/// Expand `%NAME%` references, leaving unknown ones untouched.
pub fn expand_env_vars(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_VAR
        .replace_all(path, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// `reg.exe` and `powershell.exe`, located once.
#[derive(Debug, Clone)]
pub struct WindowsProfiles {
    reg: PathBuf,
    powershell: PathBuf,
}

impl WindowsProfiles {
    /// Locate the tools on `PATH`.
    pub fn new() -> Result<Self, DirectoryError> {
        let locate = |tool: &'static str| {
            which::which(tool).map_err(|_| DirectoryError::Tool {
                tool,
                message: ToolError::Missing(tool).to_string(),
            })
        };
        Ok(Self {
            reg: locate("reg")?,
            powershell: locate("powershell")?,
        })
    }

    fn powershell(&self, script: &str, timeout: Duration) -> Result<String, ToolError> {
        // -EncodedCommand takes base64 of the UTF-16LE script text.
        let script = format!(
            "$ErrorActionPreference = 'Stop'; \
             [Console]::OutputEncoding = [Text.Encoding]::UTF8; {script}"
        );
        let utf16: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let encoded = base64::engine::general_purpose::STANDARD.encode(utf16);

        let mut cmd = Command::new(&self.powershell);
        cmd.args(["-NoProfile", "-NonInteractive", "-EncodedCommand", encoded.as_str()]);
        run(cmd, timeout)
    }
}

/// Run a command to completion with output captured in temp files.
fn run(mut cmd: Command, timeout: Duration) -> Result<String, ToolError> {
    let mut stdout = tempfile::tempfile()?;
    let mut stderr = tempfile::tempfile()?;

    debug!(program = ?cmd.get_program(), "spawning");
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(stdout.try_clone()?)
        .stderr(stderr.try_clone()?)
        .spawn()?;

    let Some(status) = child.wait_timeout(timeout)? else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(ToolError::Timeout(timeout));
    };

    let read_back = |file: &mut std::fs::File| -> std::io::Result<String> {
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    };

    if !status.success() {
        return Err(ToolError::Failed {
            code: status.code(),
            stderr: read_back(&mut stderr)?.trim().to_string(),
        });
    }
    Ok(read_back(&mut stdout)?)
}

fn profile_key(sid: &Sid) -> String {
    format!(r"{PROFILE_LIST_KEY}\{sid}")
}

impl ProfileDirectory for WindowsProfiles {
    fn list_profiles(&self) -> Result<Vec<RawProfileEntry>, DirectoryError> {
        let mut cmd = Command::new(&self.reg);
        cmd.args(["query", PROFILE_LIST_KEY, "/s"]);
        let output = run(cmd, QUERY_TIMEOUT).map_err(|e| DirectoryError::Tool {
            tool: "reg query",
            message: e.to_string(),
        })?;

        let mut entries = parse_profile_list(&output);
        for entry in &mut entries {
            entry.image_path = expand_env_vars(&entry.image_path, |name| std::env::var(name).ok());
        }
        Ok(entries)
    }

    fn resolve_name(&self, sid: &Sid) -> Result<String, DirectoryError> {
        // `Sid` renders as digits and dashes only, so it is safe to embed.
        let script = format!(
            "(New-Object System.Security.Principal.SecurityIdentifier('{sid}'))\
             .Translate([System.Security.Principal.NTAccount]).Value"
        );
        let name = self
            .powershell(&script, QUERY_TIMEOUT)
            .map_err(|_| DirectoryError::NotFound(sid.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::NotFound(sid.to_string()));
        }
        Ok(name.to_string())
    }

    fn profiles_directory(&self) -> Result<Option<String>, DirectoryError> {
        let mut cmd = Command::new(&self.reg);
        cmd.args(["query", PROFILE_LIST_KEY, "/v", "ProfilesDirectory"]);
        let output = run(cmd, QUERY_TIMEOUT).map_err(|e| DirectoryError::Tool {
            tool: "reg query",
            message: e.to_string(),
        })?;
        Ok(parse_profiles_directory(&output)
            .map(|dir| expand_env_vars(&dir, |name| std::env::var(name).ok())))
    }
}

impl ProfileStore for WindowsProfiles {
    fn is_loaded(&self, sid: &Sid) -> Result<bool, StoreError> {
        let script = format!(
            "$p = Get-CimInstance -ClassName Win32_UserProfile -Filter \"SID='{sid}'\"; \
             if ($p) {{ [string]$p.Loaded }} else {{ 'False' }}"
        );
        let out = self
            .powershell(&script, QUERY_TIMEOUT)
            .map_err(|e| StoreError::query(sid, e))?;
        match out.trim() {
            s if s.eq_ignore_ascii_case("true") => Ok(true),
            s if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(StoreError::query(sid, format!("unexpected output '{other}'"))),
        }
    }

    fn delete(&self, sid: &Sid) -> Result<(), StoreError> {
        let script = format!(
            "$p = Get-CimInstance -ClassName Win32_UserProfile -Filter \"SID='{sid}'\"; \
             if ($p) {{ Remove-CimInstance -InputObject $p }}"
        );
        self.powershell(&script, DELETE_TIMEOUT)
            .map(|_| ())
            .map_err(|e| StoreError::delete(sid, e))
    }

    fn repair(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        if record.image_path.is_empty() {
            return Err(StoreError::repair(&record.sid, "no image path to restore"));
        }
        let key = profile_key(&record.sid);
        let values: [(&str, &str, &str); 3] = [
            ("Flags", "REG_DWORD", "0"),
            ("State", "REG_DWORD", "0"),
            ("ProfileImagePath", "REG_EXPAND_SZ", &record.image_path),
        ];

        for (name, kind, data) in values {
            let mut cmd = Command::new(&self.reg);
            cmd.args(["add", key.as_str(), "/v", name, "/t", kind, "/d", data, "/f"]);
            run(cmd, QUERY_TIMEOUT)
                .map_err(|e| StoreError::repair(&record.sid, format!("{name}: {e}")))?;
        }
        Ok(())
    }
}
