use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const MANIFEST: &str = r#"{
  "schema-version": 1,
  "root": {
    "name": "app",
    "usage": "demo application",
    "flags": [
      { "name": "verbose", "short": "v", "kind": "bool", "usage": "chatty output" },
      { "name": "config", "short": "c", "usage": "config file" }
    ],
    "commands": [
      {
        "name": "serve",
        "usage": "start the server",
        "flags": [
          { "name": "port", "short": "p", "kind": "uint", "default": 8080 }
        ]
      }
    ]
  }
}"#;

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("argtree-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_manifest(dir: &Path) -> PathBuf {
    let path = dir.join("argtree.json");
    fs::write(&path, MANIFEST).expect("failed to write manifest");
    path
}

fn argtree() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_argtree"));
    cmd.env_remove("ARGTREE_LOG");
    cmd
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let out = argtree()
        .current_dir(dir)
        .arg("run")
        .args(args)
        .output()
        .expect("failed to run argtree run");
    assert_success(&out, "argtree run");
    serde_json::from_slice(&out.stdout).expect("run output is not JSON")
}

#[test]
fn help_works() {
    let out = argtree()
        .arg("--help")
        .output()
        .expect("failed to run argtree --help");
    assert_success(&out, "argtree --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("check") && stdout.contains("run") && stdout.contains("help-for"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn bare_invocation_prints_help() {
    let out = argtree().output().expect("failed to run argtree");
    assert_success(&out, "argtree");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Inspect and dry-run"), "unexpected output:\n{stdout}");
}

#[test]
fn check_counts_commands_and_flags() {
    let dir = make_temp_dir("check");
    let manifest = write_manifest(&dir);

    let out = argtree()
        .arg("-m")
        .arg(&manifest)
        .arg("check")
        .output()
        .expect("failed to run argtree check");
    assert_success(&out, "argtree check");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("root: app\n"), "{stdout}");
    assert!(stdout.contains("commands: 2\n"), "{stdout}");
    assert!(stdout.contains("flags: 3\n"), "{stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn check_without_manifest_fails_with_context() {
    let dir = make_temp_dir("check-missing");

    let out = argtree()
        .current_dir(&dir)
        .arg("check")
        .output()
        .expect("failed to run argtree check");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no argtree.json in"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_reports_leaf_values() {
    let dir = make_temp_dir("run-last");
    write_manifest(&dir);

    let report = run_json(&dir, &["--", "-v", "serve", "--port=9000", "x", "-"]);
    assert_eq!(report["outcome"], "values");
    let commands = report["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["path"], "app.serve");
    assert_eq!(commands[0]["args"], serde_json::json!(["x", "-"]));
    assert_eq!(commands[0]["flags"]["port"], "9000");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_all_mode_reports_every_command() {
    let dir = make_temp_dir("run-all");
    write_manifest(&dir);

    let report = run_json(&dir, &["--mode", "all", "--", "-c", "a.toml", "serve"]);
    let commands = report["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0]["path"], "app");
    assert_eq!(commands[0]["flags"]["config"], "a.toml");
    assert_eq!(commands[0]["flags"]["verbose"], serde_json::Value::Null);
    assert_eq!(commands[1]["flags"]["port"], "8080");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_runner_mode_reports_path() {
    let dir = make_temp_dir("run-runner");
    write_manifest(&dir);

    let report = run_json(&dir, &["--mode=runner", "--", "serve", "a", "b"]);
    assert_eq!(report["outcome"], "runners");
    assert_eq!(report["commands"][1]["args"], serde_json::json!(["a", "b"]));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_target_help_is_reported() {
    let dir = make_temp_dir("run-help");
    write_manifest(&dir);

    let report = run_json(&dir, &["--", "serve", "-h"]);
    assert_eq!(report["outcome"], "help");
    let text = report["text"].as_str().unwrap();
    assert!(text.contains("app serve [flags]"), "{text}");
    assert!(text.contains("(default: 8080)"), "{text}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_target_usage_error_exits_with_two() {
    let dir = make_temp_dir("run-usage");
    write_manifest(&dir);

    let out = argtree()
        .current_dir(&dir)
        .args(["run", "--", "serve", "--prot", "1"])
        .output()
        .expect("failed to run argtree run");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("Error: unknown flag: --prot\n"), "{stderr}");
    assert!(stderr.contains("Did you mean this?\n\t--port"), "{stderr}");
    assert!(stderr.contains("app serve [flags]"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn run_can_keep_unknown_flags() {
    let dir = make_temp_dir("run-unknown");
    write_manifest(&dir);

    let report = run_json(&dir, &["--allow-unknown-flag", "--", "--bogus", "x"]);
    assert_eq!(report["commands"][0]["path"], "app");
    assert_eq!(report["commands"][0]["args"], serde_json::json!(["--bogus", "x"]));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn front_end_usage_error_exits_with_two() {
    let out = argtree()
        .args(["run", "--mode", "fast"])
        .output()
        .expect("failed to run argtree run");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid argument \"fast\" for --mode flag"), "{stderr}");
    assert!(stderr.contains("Did you mean this?\n\tlast"), "{stderr}");
}

#[test]
fn help_for_walks_the_manifest_tree() {
    let dir = make_temp_dir("help-for");
    let manifest = write_manifest(&dir);

    let out = argtree()
        .arg("--manifest")
        .arg(&manifest)
        .args(["help-for", "serve"])
        .output()
        .expect("failed to run argtree help-for");
    assert_success(&out, "argtree help-for");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("start the server\n\nUsage:\n  app serve [flags]\n"), "{stdout}");

    let out = argtree()
        .arg("--manifest")
        .arg(&manifest)
        .args(["help-for", "serv"])
        .output()
        .expect("failed to run argtree help-for");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("did you mean \"serve\"?"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}
