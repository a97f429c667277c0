//! Integration tests for the `bulk-backup-ios` binary.
//!
//! These tests exercise the CLI layer end-to-end: they spawn the actual compiled
//! binary and assert on exit codes, stdout, and stderr.  No network device is
//! required — the only connection ever attempted is to a closed loopback port.
//!
//! # Running
//!
//! ```sh
//! cargo test --test integration
//! ```

use std::{fs, path::Path, process::Command};

/// Absolute path to the compiled binary, resolved at compile time by Cargo.
const BIN: &str = env!("CARGO_BIN_EXE_bulk-backup-ios");

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Run the binary with `args` in `dir`.
///
/// `HOME` and `XDG_CONFIG_HOME` point into `dir` so a per-user config on the
/// test machine can never leak in.  Returns `(exit_success, stdout, stderr)`.
fn run_in(args: &[&str], dir: &Path) -> (bool, String, String) {
    let out = Command::new(BIN)
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to spawn {BIN}: {e}"));

    (
        out.status.success(),
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
    )
}

fn run(args: &[&str]) -> (bool, String, String) {
    let dir = tempfile::tempdir().unwrap();
    run_in(args, dir.path())
}

// ─── --help / --version ───────────────────────────────────────────────────────

#[test]
fn help_exits_zero() {
    let (ok, stdout, _) = run(&["--help"]);
    assert!(ok, "--help should exit 0");
    assert!(stdout.contains("bulk-backup-ios"));
    assert!(stdout.contains("--devices"));
    assert!(stdout.contains("--write"));
}

#[test]
fn version_exits_zero() {
    let (ok, stdout, _) = run(&["--version"]);
    assert!(ok, "--version should exit 0");
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn unknown_flag_exits_nonzero() {
    let (ok, _, _) = run(&["--this-flag-does-not-exist"]);
    assert!(!ok, "unknown flag should exit non-zero");
}

// ─── init ─────────────────────────────────────────────────────────────────────

#[test]
fn init_creates_config() {
    let dir = tempfile::tempdir().unwrap();
    let (ok, _, _) = run_in(&["init"], dir.path());
    assert!(ok, "init should exit 0");

    let content = fs::read_to_string(dir.path().join("bulkbackup.toml")).unwrap();
    assert!(content.contains("[ssh]"));
    assert!(content.contains("[commands]"));
    assert!(content.contains("show startup-config"));
    toml::from_str::<toml::Value>(&content).expect("generated config must be valid TOML");
}

#[test]
fn init_with_custom_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let custom = dir.path().join("custom.toml");
    let (ok, _, _) = run_in(&["--config", custom.to_str().unwrap(), "init"], dir.path());
    assert!(ok);
    assert!(custom.exists(), "custom.toml should be created");
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bulkbackup.toml");
    fs::write(&path, "# existing").unwrap();

    let (ok, stdout, stderr) = run_in(&["init"], dir.path());
    assert!(!ok, "init should fail when the config already exists");
    assert_eq!(fs::read_to_string(&path).unwrap(), "# existing");

    let combined = format!("{stdout}{stderr}");
    assert!(
        combined.contains("already exists"),
        "error message should explain why init failed; got: {combined}"
    );
}

// ─── --print-config ───────────────────────────────────────────────────────────

#[test]
fn print_config_with_missing_config_uses_defaults() {
    let (ok, stdout, _) = run(&["--print-config"]);
    assert!(ok, "--print-config should exit 0 even without a config file");
    assert!(stdout.contains("show startup-config"));
    assert!(stdout.contains("CiscoIos"));
}

#[test]
fn print_config_reads_specified_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("lab.toml");
    fs::write(&cfg, "[output]\ndir = \"/srv/backups-xyz\"\n").unwrap();

    let (ok, stdout, _) = run_in(
        &["--config", cfg.to_str().unwrap(), "--print-config"],
        dir.path(),
    );
    assert!(ok);
    assert!(stdout.contains("/srv/backups-xyz"));
}

#[test]
fn print_config_errors_on_invalid_toml() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bulkbackup.toml"), "not valid toml ][[[").unwrap();
    let (ok, _, _) = run_in(&["--print-config"], dir.path());
    assert!(!ok, "invalid TOML should cause a non-zero exit");
}

#[test]
fn print_config_errors_on_bad_header_template() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bulkbackup.toml"),
        "[output]\nheader = \"at %Q\"\n",
    )
    .unwrap();
    let (ok, _, stderr) = run_in(&["--print-config"], dir.path());
    assert!(!ok);
    assert!(stderr.contains("header"), "got: {stderr}");
}

// ─── host selection ───────────────────────────────────────────────────────────

#[test]
fn missing_default_hosts_file_exits_nonzero() {
    let (ok, _, stderr) = run(&["-u", "admin", "-p", "pw"]);
    assert!(!ok);
    assert!(
        stderr.contains("BulkBackupIOS.hosts"),
        "error should name the host list; got: {stderr}"
    );
}

#[test]
fn only_malformed_entries_means_nothing_to_do() {
    let (ok, _, stderr) = run(&["-D", ",orphan", "-u", "admin", "-p", "pw"]);
    assert!(!ok);
    assert!(stderr.contains("--device entry 1: missing host field"), "got: {stderr}");
    assert!(stderr.contains("no devices to back up"), "got: {stderr}");
}

#[test]
fn empty_hosts_file_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.hosts"), "# nothing yet\n\n").unwrap();
    let (ok, _, stderr) = run_in(&["empty.hosts", "-u", "a", "-p", "b"], dir.path());
    assert!(!ok);
    assert!(stderr.contains("no devices to back up"));
}

// ─── per-device failure isolation ─────────────────────────────────────────────

#[test]
fn unreachable_devices_are_all_attempted_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lab.hosts"),
        "127.0.0.1:9,lab-a\n,broken\n127.0.0.1:9,lab-b\n",
    )
    .unwrap();

    let (ok, stdout, stderr) = run_in(&["-d", "lab.hosts", "-u", "admin", "-p", "pw"], dir.path());
    assert!(!ok, "a failed device must give a non-zero exit");
    assert!(stdout.contains("[1/2]") && stdout.contains("[2/2]"), "got: {stdout}");
    assert!(stderr.contains("line 2: missing host field"), "got: {stderr}");
    assert!(stderr.contains("2 of 2 device(s) failed"), "got: {stderr}");

    let outputs: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".conf") || name.ends_with(".info")
        })
        .collect();
    assert!(outputs.is_empty(), "no files should be written for failed devices");
}
