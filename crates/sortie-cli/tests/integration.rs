#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sortie(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sortie").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SORTIE_FILE")
        .env("RUST_LOG", "warn");
    cmd
}

fn write_plan(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("sortie.yaml"), yaml).unwrap();
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    serde_json::from_slice(&out.stdout).unwrap()
}

fn metrics(report: &serde_json::Value) -> Vec<String> {
    report["samples"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["metric"].as_str().unwrap().to_string())
        .collect()
}

const TWO_SORTIES: &str = r#"
resources:
  hosts: [node-a, node-b]
benchmarks:
  - name: alpha
    kind: shell
    prepare: echo prepared >> journal.txt
    run: echo "$SORTIE_BENCHMARK on $SORTIE_HOSTS"
    cleanup: echo cleaned >> journal.txt
  - name: beta
    kind: noop
sorties:
  - [alpha, beta]
  - [alpha]
"#;

const FAILING_FIRST: &str = r#"
benchmarks:
  - name: broken
    kind: shell
    run: exit 3
    cleanup: touch cleaned.flag
  - name: later
    kind: shell
    run: touch later.flag
sorties:
  - [broken]
  - [later]
"#;

// ---------------------------------------------------------------------------
// sortie init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_starter_plan() {
    let dir = TempDir::new().unwrap();
    sortie(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let content = std::fs::read_to_string(dir.path().join("sortie.yaml")).unwrap();
    assert!(content.contains("warm-cache"));
    assert!(content.contains("sorties"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, "sorties: []\n");
    sortie(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let content = std::fs::read_to_string(dir.path().join("sortie.yaml")).unwrap();
    assert_eq!(content, "sorties: []\n");
}

#[test]
fn starter_plan_validates() {
    let dir = TempDir::new().unwrap();
    sortie(&dir).arg("init").assert().success();
    sortie(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan is valid"));
}

// ---------------------------------------------------------------------------
// sortie validate
// ---------------------------------------------------------------------------

#[test]
fn validate_rejects_unknown_member() {
    let dir = TempDir::new().unwrap();
    write_plan(
        &dir,
        "benchmarks:\n  - name: a\n    kind: noop\nsorties:\n  - [a, ghost]\n",
    );
    sortie(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stdout(predicate::str::contains("ghost"));
}

#[test]
fn validate_json_lists_warnings() {
    let dir = TempDir::new().unwrap();
    write_plan(
        &dir,
        "benchmarks:\n  - name: a\n    kind: noop\n  - name: spare\n    kind: noop\nsorties:\n  - [a]\n",
    );
    let value = json_stdout(sortie(&dir).args(["validate", "--json"]));
    let warnings = value["warnings"].as_array().unwrap();
    assert!(warnings
        .iter()
        .any(|w| w["message"].as_str().unwrap().contains("spare")));
}

#[test]
fn missing_plan_is_reported() {
    let dir = TempDir::new().unwrap();
    sortie(&dir)
        .args(["validate", "--file", "nowhere.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plan file not found"));
}

// ---------------------------------------------------------------------------
// sortie plan
// ---------------------------------------------------------------------------

#[test]
fn plan_shows_manifest_and_setup_order() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, TWO_SORTIES);
    let value = json_stdout(sortie(&dir).args(["plan", "--json"]));

    assert_eq!(value["sorties"], serde_json::json!([["alpha", "beta"], ["alpha"]]));
    assert_eq!(value["setup_order"], serde_json::json!(["alpha", "beta"]));
}

#[test]
fn plan_is_found_from_subdirectory() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, TWO_SORTIES);
    let nested = dir.path().join("results/today");
    std::fs::create_dir_all(&nested).unwrap();

    Command::cargo_bin("sortie")
        .unwrap()
        .current_dir(&nested)
        .env_remove("SORTIE_FILE")
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha, beta"));
}

// ---------------------------------------------------------------------------
// sortie run
// ---------------------------------------------------------------------------

#[test]
fn run_emits_full_sample_stream() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, TWO_SORTIES);
    let report = json_stdout(sortie(&dir).args(["run", "--json"]));

    assert_eq!(report["outcome"]["type"], "completed");
    let metrics = metrics(&report);
    assert_eq!(metrics.first().map(String::as_str), Some("alpha_prepare_time"));
    assert_eq!(
        metrics.iter().filter(|m| *m == "sortie_start").count(),
        2
    );
    assert!(metrics.contains(&"parallel_alpha_runtime".to_string()));
    assert!(metrics.contains(&"overall_end".to_string()));

    // alpha appears in both sorties but is prepared and cleaned up once.
    let journal = std::fs::read_to_string(dir.path().join("journal.txt")).unwrap();
    assert_eq!(journal, "prepared\ncleaned\n");
}

#[test]
fn aborted_run_exits_with_sortie_status() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, FAILING_FIRST);
    let out = sortie(&dir).args(["run", "--json"]).output().unwrap();

    assert_eq!(out.status.code(), Some(3));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["outcome"]["type"], "aborted");
    assert_eq!(report["outcome"]["status"], 3);
    assert!(!metrics(&report).contains(&"overall_end".to_string()));
    assert!(String::from_utf8_lossy(&out.stderr).contains("sortie 0 failed with status 3"));

    // Later sorties never run; cleanup still happens.
    assert!(!dir.path().join("later.flag").exists());
    assert!(dir.path().join("cleaned.flag").exists());
}

#[test]
fn run_stage_without_cleanup_leaves_benchmarks_in_place() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, TWO_SORTIES);
    sortie(&dir)
        .args(["run", "--run-stage", "prepare,run"])
        .assert()
        .success();

    let journal = std::fs::read_to_string(dir.path().join("journal.txt")).unwrap();
    assert_eq!(journal, "prepared\n");
}

#[test]
fn run_stage_without_run_skips_commands() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, FAILING_FIRST);
    sortie(&dir)
        .args(["run", "--run-stage", "prepare,cleanup"])
        .assert()
        .success();
    assert!(dir.path().join("cleaned.flag").exists());
}

#[test]
fn run_refuses_plan_with_errors() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, "sorties:\n  - [ghost]\n");
    sortie(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("plan has errors"));
}

#[test]
fn invalid_run_stage_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_plan(&dir, TWO_SORTIES);
    sortie(&dir)
        .args(["run", "--run-stage", ""])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --run-stage"));
}
