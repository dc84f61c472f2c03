use assert_cmd::Command;
use std::io::Write;

/// Builds a `meta/run-state.json` like `run` would leave behind, for `status` to read.
fn write_run_state(results_dir: &std::path::Path, body: &str) {
    let meta_dir = results_dir.join("meta");
    std::fs::create_dir_all(&meta_dir).unwrap();
    std::fs::write(meta_dir.join("run-state.json"), body).unwrap();
}

#[test]
fn status_reports_failure_exit_code_when_a_slot_failed() {
    let dir = tempfile::tempdir().unwrap();
    write_run_state(
        dir.path(),
        r#"[
            {"plugin": "e2e", "node": "global", "status": "complete", "result_status": "passed", "error_message": null},
            {"plugin": "systemd-logs", "node": "node-1", "status": "failed", "result_status": "failed", "error_message": "boom"}
        ]"#,
    );

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .args(["status", "--results-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn status_reports_success_exit_code_when_every_slot_passed() {
    let dir = tempfile::tempdir().unwrap();
    write_run_state(
        dir.path(),
        r#"[{"plugin": "e2e", "node": "global", "status": "complete", "result_status": "passed", "error_message": null}]"#,
    );

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .args(["status", "--results-dir"])
        .arg(dir.path())
        .assert()
        .success();
}

#[test]
fn status_errors_with_operational_exit_code_when_no_run_state_exists() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .args(["status", "--results-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn retrieve_gives_up_after_exhausting_its_bounded_retries() {
    let source_dir = tempfile::tempdir().unwrap();
    let dest_dir = tempfile::tempdir().unwrap();
    let missing_archive = source_dir.path().join("results.tar.gz");

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .arg("retrieve")
        .arg(dest_dir.path())
        .args(["--from"])
        .arg(&missing_archive)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn retrieve_copies_a_ready_archive_into_the_destination() {
    let source_dir = tempfile::tempdir().unwrap();
    let dest_dir = tempfile::tempdir().unwrap();
    let archive_path = source_dir.path().join("results.tar.gz");
    std::fs::File::create(&archive_path)
        .unwrap()
        .write_all(b"not a real gzip, but retrieve only checks for existence")
        .unwrap();

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .arg("retrieve")
        .arg(dest_dir.path())
        .args(["--from"])
        .arg(&archive_path)
        .assert()
        .success();

    assert!(dest_dir.path().join("results.tar.gz").is_file());
}

#[test]
fn results_report_mode_exits_nonzero_for_a_failed_tree() {
    let results_dir = tempfile::tempdir().unwrap();
    let plugin_dir = results_dir.path().join("plugins").join("e2e");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("sonobuoy_results.yaml"),
        "name: e2e\nstatus: failed\nitems: []\n",
    )
    .unwrap();

    let archive_path = results_dir.path().join("results.tar.gz");
    let file = std::fs::File::create(&archive_path).unwrap();
    archive::assemble(results_dir.path(), file).unwrap();

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .args(["results", "--mode", "report"])
        .arg(&archive_path)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn results_report_mode_succeeds_for_a_passed_tree() {
    let results_dir = tempfile::tempdir().unwrap();
    let plugin_dir = results_dir.path().join("plugins").join("e2e");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("sonobuoy_results.yaml"),
        "name: e2e\nstatus: passed\nitems: []\n",
    )
    .unwrap();

    let archive_path = results_dir.path().join("results.tar.gz");
    let file = std::fs::File::create(&archive_path).unwrap();
    archive::assemble(results_dir.path(), file).unwrap();

    Command::cargo_bin("sonobuoy")
        .unwrap()
        .args(["results", "--mode", "report"])
        .arg(&archive_path)
        .assert()
        .success();
}
