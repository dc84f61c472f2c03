use model::slot::{ExpectedResult, NodeKey, ResultStatus, SlotKey, SlotStatus};
use model::{ContainerSpec, Driver, PluginDefinition, ResultFormat};
use std::collections::BTreeMap;
use std::path::Path;

fn plugin(name: &str, driver: Driver, format: ResultFormat) -> PluginDefinition {
    PluginDefinition {
        name: name.to_string(),
        driver,
        result_format: format,
        result_files: Vec::new(),
        source_url: None,
        description: None,
        container: ContainerSpec {
            image: "example.com/plugin:latest".to_string(),
            command: Vec::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
        },
        node_selector: None,
        pod_spec_override: None,
        configmap: BTreeMap::new(),
    }
}

fn write_artifact(results_dir: &Path, plugin: &str, node: &str, filename: &str, contents: &str) {
    let dir = results_dir.join("plugins").join(plugin).join("results").join(node);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(filename), contents).unwrap();
}

fn complete_slot(plugin: &str, node: NodeKey, filename: &str) -> ExpectedResult {
    let mut slot = ExpectedResult::new(SlotKey::new(plugin, node));
    slot.status = SlotStatus::Complete;
    slot.filename = Some(filename.to_string());
    slot
}

const JUNIT_ONE_FAILURE: &str = r#"<testsuite>
  <testcase classname="conformance" name="pods-should-run">
    <failure message="pod never became ready"/>
  </testcase>
  <testcase classname="conformance" name="nodes-should-be-ready"/>
</testsuite>"#;

#[test]
fn junit_job_plugin_rolls_up_to_failed() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "e2e", "global", "junit.xml", JUNIT_ONE_FAILURE);
    let p = plugin("e2e", Driver::Job, ResultFormat::Junit);
    let slots = vec![complete_slot("e2e", NodeKey::Global, "junit.xml")];

    let outcomes = postprocess::process_all(&[p], &slots, dir.path()).unwrap();
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.tree.status, ResultStatus::Failed);
    assert_eq!(outcome.slot_results.len(), 1);
    assert_eq!(outcome.slot_results[0].1, ResultStatus::Failed);

    let counts = outcome.tree.leaf_counts();
    assert_eq!(counts.total, 2);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.passed, 1);
}

#[test]
fn raw_daemonset_plugin_produces_one_branch_per_node() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "sysinfo", "node-a", "uname.txt", "Linux");
    write_artifact(dir.path(), "sysinfo", "node-b", "uname.txt", "Linux");
    let p = plugin("sysinfo", Driver::DaemonSet, ResultFormat::Raw);
    let slots = vec![
        complete_slot("sysinfo", NodeKey::Node("node-a".to_string()), "uname.txt"),
        complete_slot("sysinfo", NodeKey::Node("node-b".to_string()), "uname.txt"),
    ];

    let outcomes = postprocess::process_all(&[p], &slots, dir.path()).unwrap();
    let tree = &outcomes[0].tree;
    assert_eq!(tree.name, "sysinfo");
    assert_eq!(tree.items.len(), 2);
    assert_eq!(tree.items[0].name, "node-a");
    assert_eq!(tree.items[1].name, "node-b");
}

#[test]
fn manual_override_survives_to_job_tree_root() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(
        dir.path(),
        "custom-check",
        "global",
        "result.yaml",
        "name: custom-check\nstatus: flaky\nitems: []\n",
    );
    let p = plugin("custom-check", Driver::Job, ResultFormat::Manual);
    let slots = vec![complete_slot("custom-check", NodeKey::Global, "result.yaml")];

    let outcomes = postprocess::process_all(&[p], &slots, dir.path()).unwrap();
    assert_eq!(outcomes[0].tree.status, ResultStatus::Other("flaky".to_string()));
    assert_eq!(
        outcomes[0].slot_results[0].1,
        ResultStatus::Other("flaky".to_string())
    );
}

#[test]
fn unparseable_junit_becomes_unknown_leaf_not_a_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "e2e", "global", "junit.xml", "<not-xml");
    let p = plugin("e2e", Driver::Job, ResultFormat::Junit);
    let slots = vec![complete_slot("e2e", NodeKey::Global, "junit.xml")];

    let outcomes = postprocess::process_all(&[p], &slots, dir.path()).unwrap();
    let tree = &outcomes[0].tree;
    assert_eq!(tree.status, ResultStatus::Unknown);
    assert!(tree.details.contains_key("error"));
}

#[test]
fn failed_slot_with_no_artifact_is_an_unknown_leaf_with_reason() {
    let dir = tempfile::tempdir().unwrap();
    let p = plugin("e2e", Driver::Job, ResultFormat::Junit);
    let mut slot = ExpectedResult::new(SlotKey::global("e2e"));
    slot.status = SlotStatus::Failed;
    slot.error_message = Some("pod CrashLoopBackOff".to_string());

    let outcomes = postprocess::process_all(&[p], &[slot], dir.path()).unwrap();
    let tree = &outcomes[0].tree;
    assert_eq!(tree.status, ResultStatus::Failed);
    assert_eq!(tree.details.get("error").unwrap(), "pod CrashLoopBackOff");
}

#[test]
fn processing_is_deterministic_across_repeated_runs() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "e2e", "global", "junit.xml", JUNIT_ONE_FAILURE);
    let p = plugin("e2e", Driver::Job, ResultFormat::Junit);
    let slots = vec![complete_slot("e2e", NodeKey::Global, "junit.xml")];

    let first = postprocess::process_all(&[p.clone()], &slots, dir.path()).unwrap();
    let second = postprocess::process_all(&[p], &slots, dir.path()).unwrap();
    let first_yaml = serde_yaml::to_string(&first[0].tree).unwrap();
    let second_yaml = serde_yaml::to_string(&second[0].tree).unwrap();
    assert_eq!(first_yaml, second_yaml);
}
