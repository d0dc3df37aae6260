//! Integration tests for the profsweep CLI.

use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

const ALICE: &str = "S-1-5-21-1-2-3-1001";
const BOB: &str = "S-1-5-21-1-2-3-1002";
const CAROL: &str = "S-1-5-21-1-2-3-1003";
const DAVE: &str = "S-1-5-21-1-2-3-1004";
const SYSTEM: &str = "S-1-5-18";

/// Ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

/// FILETIME of `days` ago, split into (high, low).
fn days_ago(days: u64) -> (u64, u64) {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - days * 86_400;
    let ticks = UNIX_EPOCH_TICKS + secs * 10_000_000;
    (ticks >> 32, ticks & 0xFFFF_FFFF)
}

fn entry(sid: &str, folder: &str, load: (u64, u64), unload: (u64, u64), loaded: bool) -> Value {
    json!({
        "key": sid,
        "image_path": format!(r"C:\Users\{folder}"),
        "load_high": load.0, "load_low": load.1,
        "unload_high": unload.0, "unload_low": unload.1,
        "name": format!(r"HOST\{folder}"),
        "loaded": loaded,
    })
}

/// A temp inventory and users root with four accounts:
/// alice (stale), bob (recent), carol (stale but loaded), dave (stale, unclean shutdown).
struct TestContext {
    temp_dir: TempDir,
    inventory: PathBuf,
    users_root: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let inventory = temp_dir.path().join("inventory.json");
        let users_root = temp_dir.path().join("Users");

        let old = days_ago(400);
        let older = days_ago(401);
        let recent = days_ago(2);
        let doc = json!({
            "profiles": [
                {"key": SYSTEM, "image_path": r"C:\Windows\system32\config\systemprofile"},
                entry(ALICE, "alice", old, old, false),
                entry(BOB, "bob", recent, recent, false),
                entry(CAROL, "carol", old, old, true),
                entry(DAVE, "dave", old, older, false),
            ]
        });
        std::fs::write(&inventory, serde_json::to_vec_pretty(&doc).unwrap())
            .expect("failed to write inventory");

        for folder in ["alice", "bob", "carol", "dave", "Public", "zed"] {
            std::fs::create_dir_all(users_root.join(folder)).expect("failed to create folder");
        }
        std::fs::write(users_root.join("zed").join("ntuser.dat"), b"stale")
            .expect("failed to write file");

        Self {
            temp_dir,
            inventory,
            users_root,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_profsweep"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("PROFSWEEP_DAYS");
        cmd.env_remove("PROFSWEEP_USERS_ROOT");
        cmd.env_remove("PROFSWEEP_INVENTORY");
        cmd.env_remove("SystemDrive");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn scan(&self, global: &[&str], args: &[&str]) -> Output {
        self.cmd()
            .args(global)
            .arg("scan")
            .arg("--inventory")
            .arg(&self.inventory)
            .arg("--users-root")
            .arg(&self.users_root)
            .args(args)
            .output()
            .expect("failed to run profsweep")
    }

    /// Rewrite the inventory with a `profiles_directory` value.
    fn set_profiles_directory(&self, dir: &std::path::Path) {
        let mut doc: Value =
            serde_json::from_slice(&std::fs::read(&self.inventory).unwrap()).unwrap();
        doc["profiles_directory"] = json!(dir.to_string_lossy());
        std::fs::write(&self.inventory, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    }

    fn inventory_keys(&self) -> Vec<String> {
        let doc: Value = serde_json::from_slice(&std::fs::read(&self.inventory).unwrap()).unwrap();
        doc["profiles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["key"].as_str().unwrap().to_string())
            .collect()
    }

    fn folder(&self, name: &str) -> PathBuf {
        self.users_root.join(name)
    }
}

fn events(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}

fn disposition_of(events: &[Value], sid: &str) -> Value {
    events
        .iter()
        .find(|e| e["event"] == "profile" && e["record"]["sid"] == sid)
        .unwrap_or_else(|| panic!("no profile event for {sid}"))["classification"]["disposition"]
        .clone()
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("scan"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.cmd().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
}

#[test]
fn test_completions_command() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["completions", "bash"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("profsweep"));
}

#[test]
fn test_scan_lists_without_changes() {
    let ctx = TestContext::new();
    let output = ctx.scan(&[], &[]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(ALICE));
    assert!(stdout.contains(r"HOST\alice"));
    assert!(stdout.contains("preserved"));
    assert!(stdout.contains("loaded"));
    assert!(stdout.contains("zed"));

    assert_eq!(ctx.inventory_keys().len(), 5);
    assert!(ctx.folder("zed").exists());
}

#[test]
fn test_json_dispositions() {
    let ctx = TestContext::new();
    let output = ctx.scan(&["--json"], &[]);
    assert!(output.status.success(), "{output:?}");

    let events = events(&output);
    assert_eq!(disposition_of(&events, SYSTEM), "admin_exempt");
    assert_eq!(disposition_of(&events, ALICE), "eviction_candidate");
    assert_eq!(disposition_of(&events, BOB), "preserved");
    assert_eq!(disposition_of(&events, CAROL), "loaded_exempt");
    // Without --dirty an unclean shutdown is only annotated.
    assert_eq!(disposition_of(&events, DAVE), "eviction_candidate");

    let orphans: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "folder")
        .map(|e| e["folder"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(orphans, ["zed"]);

    let summary = events.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["candidates"], 2);
    assert_eq!(summary["deleted"], 0);
    assert_eq!(summary["orphans"], 1);
}

#[test]
fn test_listing_is_newest_first() {
    let ctx = TestContext::new();
    let output = ctx.scan(&["--json"], &[]);
    let events = events(&output);
    let order: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "profile")
        .map(|e| e["record"]["sid"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(order.first().map(String::as_str), Some(BOB));
    assert_eq!(order.last().map(String::as_str), Some(SYSTEM));
}

#[test]
fn test_select_dirty_only() {
    let ctx = TestContext::new();
    let output = ctx.scan(&["--json"], &["--days", "9999", "--dirty"]);
    assert!(output.status.success(), "{output:?}");

    let events = events(&output);
    assert_eq!(disposition_of(&events, ALICE), "preserved");
    assert_eq!(
        disposition_of(&events, DAVE),
        json!({"unclean_shutdown": 0})
    );
}

#[test]
fn test_days_out_of_range_rejected() {
    let ctx = TestContext::new();
    let output = ctx.scan(&[], &["--days", "10000"]);
    assert!(!output.status.success());
}

#[test]
fn test_cleanup_deletes_stale_profiles() {
    let ctx = TestContext::new();
    let output = ctx.scan(&[], &["--cleanup", "--yes"]);
    assert!(output.status.success(), "{output:?}");

    let keys = ctx.inventory_keys();
    assert!(!keys.contains(&ALICE.to_string()));
    assert!(!keys.contains(&DAVE.to_string()));
    assert!(keys.contains(&BOB.to_string()));
    assert!(keys.contains(&CAROL.to_string()));
    assert!(keys.contains(&SYSTEM.to_string()));

    // Profile cleanup alone leaves folders alone.
    assert!(ctx.folder("zed").exists());
}

#[test]
fn test_orphan_removal() {
    let ctx = TestContext::new();
    let output = ctx.scan(&[], &["--orphans", "--yes"]);
    assert!(output.status.success(), "{output:?}");

    assert!(!ctx.folder("zed").exists());
    assert!(ctx.folder("Public").exists());
    assert!(ctx.folder("alice").exists());
    assert_eq!(ctx.inventory_keys().len(), 5);
}

#[test]
fn test_dry_run_changes_nothing() {
    let ctx = TestContext::new();
    let output = ctx.scan(&["--dry-run"], &["--all", "--yes"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(dry run)"));
    assert_eq!(ctx.inventory_keys().len(), 5);
    assert!(ctx.folder("zed").exists());
}

#[test]
fn test_declined_confirmation_changes_nothing() {
    let ctx = TestContext::new();
    // stdin is empty, which reads as "no".
    let output = ctx
        .cmd()
        .arg("scan")
        .arg("--inventory")
        .arg(&ctx.inventory)
        .arg("--users-root")
        .arg(&ctx.users_root)
        .arg("--all")
        .stdin(std::process::Stdio::null())
        .output()
        .expect("failed to run profsweep");
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Operation cancelled"));
    assert_eq!(ctx.inventory_keys().len(), 5);
    assert!(ctx.folder("zed").exists());
}

#[test]
fn test_missing_inventory_fails() {
    let ctx = TestContext::new();
    let output = ctx
        .cmd()
        .args(["scan", "--inventory"])
        .arg(ctx.temp_dir.path().join("absent.json"))
        .output()
        .expect("failed to run profsweep");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open inventory"));
}

#[test]
fn test_users_root_from_profile_list() {
    let ctx = TestContext::new();
    ctx.set_profiles_directory(&ctx.users_root);
    let output = ctx
        .cmd()
        .current_dir(ctx.temp_dir.path())
        .args(["--json", "scan", "--orphans", "--yes", "--inventory"])
        .arg(&ctx.inventory)
        .output()
        .expect("failed to run profsweep");
    assert!(output.status.success(), "{output:?}");

    assert!(!ctx.folder("zed").exists());
    assert!(ctx.folder("alice").exists());
    assert!(
        events(&output)
            .iter()
            .any(|e| e["event"] == "info" && e["message"].as_str().unwrap().contains("profile list"))
    );
}

#[test]
fn test_guessed_users_root_never_removes_folders() {
    let ctx = TestContext::new();
    // Run from inside a system-like tree, the way a service account would.
    let home = ctx.temp_dir.path().join("config").join("systemprofile");
    let sibling = ctx.temp_dir.path().join("config").join("RegBack");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(sibling.join("SYSTEM")).unwrap();

    let output = ctx
        .cmd()
        .env("HOME", &home)
        .env("USERPROFILE", &home)
        .current_dir(&home)
        .args(["--json", "scan", "--orphans", "--yes", "--inventory"])
        .arg(&ctx.inventory)
        .output()
        .expect("failed to run profsweep");
    assert!(output.status.success(), "{output:?}");

    assert!(sibling.join("SYSTEM").exists());
    assert!(ctx.folder("zed").exists());
    let events = events(&output);
    assert!(events.iter().any(|e| e["event"] == "warning"
        && e["message"].as_str().unwrap().contains("guessed users root")));
    assert_eq!(events.last().unwrap()["orphans_removed"], 0);
}
