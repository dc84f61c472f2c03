use std::path::PathBuf;
use std::time::Duration;
use worker::WorkerConfig;

fn base_config(mount: PathBuf, result_files: Vec<String>) -> WorkerConfig {
    WorkerConfig {
        aggregator_url: "https://aggregator:8443".to_string(),
        result_type: "e2e".to_string(),
        plugin_name: "e2e".to_string(),
        node_name: None,
        progress_port: 8099,
        ca_cert_pem: String::new(),
        client_cert_pem: String::new(),
        client_key_pem: String::new(),
        results_mount_path: mount,
        result_files,
        done_poll_interval: Duration::from_millis(10),
    }
}

#[test]
fn locates_first_existing_candidate_in_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("junit.xml"), b"<testsuite/>").unwrap();
    let config = base_config(
        dir.path().to_path_buf(),
        vec!["missing.xml".to_string(), "junit.xml".to_string()],
    );

    let artifact = worker::artifact::locate(&config).unwrap();
    assert_eq!(artifact.filename, "junit.xml");
    assert_eq!(artifact.content_type, "application/xml");
    assert_eq!(artifact.body, b"<testsuite/>");
}

#[test]
fn tars_a_directory_candidate() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("report")).unwrap();
    std::fs::write(dir.path().join("report").join("a.txt"), b"hello").unwrap();
    let config = base_config(dir.path().to_path_buf(), vec!["report".to_string()]);

    let artifact = worker::artifact::locate(&config).unwrap();
    assert_eq!(artifact.filename, "report.tar.gz");
    assert_eq!(artifact.content_type, "application/gzip");
    assert!(!artifact.body.is_empty());
}

#[test]
fn falls_back_to_tarring_the_whole_mount_when_no_hints_given() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("output.txt"), b"data").unwrap();
    let config = base_config(dir.path().to_path_buf(), Vec::new());

    let artifact = worker::artifact::locate(&config).unwrap();
    assert_eq!(artifact.filename, "results.tar.gz");
}

#[test]
fn missing_all_candidates_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = base_config(dir.path().to_path_buf(), vec!["missing.xml".to_string()]);

    let err = worker::artifact::locate(&config).unwrap_err();
    assert!(matches!(err, worker::Error::NoResultArtifact { .. }));
}
