use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use k8sclient::{PodSummary, WorkloadManager};
use model::plugin::{ContainerSpec, Driver, PluginDefinition, ResultFormat};
use runctl::{RunController, RunControllerConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct FakeWorkloadManager {
    nodes: Vec<String>,
}

#[async_trait]
impl WorkloadManager for FakeWorkloadManager {
    async fn create_job(&self, _namespace: &str, job: Job) -> k8sclient::Result<Job> {
        Ok(job)
    }

    async fn create_daemonset(&self, _namespace: &str, daemonset: DaemonSet) -> k8sclient::Result<DaemonSet> {
        Ok(daemonset)
    }

    async fn create_configmap(&self, _namespace: &str, configmap: ConfigMap) -> k8sclient::Result<ConfigMap> {
        Ok(configmap)
    }

    async fn delete_job(&self, _namespace: &str, _name: &str) -> k8sclient::Result<()> {
        Ok(())
    }

    async fn delete_daemonset(&self, _namespace: &str, _name: &str) -> k8sclient::Result<()> {
        Ok(())
    }

    async fn delete_configmap(&self, _namespace: &str, _name: &str) -> k8sclient::Result<()> {
        Ok(())
    }

    async fn matching_nodes(&self, _selector: &BTreeMap<String, String>) -> k8sclient::Result<Vec<String>> {
        Ok(self.nodes.clone())
    }

    async fn pods_for_workload(&self, _namespace: &str, _workload_name: &str) -> k8sclient::Result<Vec<PodSummary>> {
        Ok(Vec::new())
    }

    async fn exec(
        &self,
        _namespace: &str,
        _pod: &str,
        _container: &str,
        _command: Vec<String>,
    ) -> k8sclient::Result<String> {
        Ok(String::new())
    }
}

fn job_plugin(name: &str) -> PluginDefinition {
    PluginDefinition {
        name: name.to_string(),
        driver: Driver::Job,
        result_format: ResultFormat::default(),
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

fn daemonset_plugin(name: &str) -> PluginDefinition {
    let mut p = job_plugin(name);
    p.driver = Driver::DaemonSet;
    p
}

fn test_config(results_dir: std::path::PathBuf) -> RunControllerConfig {
    RunControllerConfig {
        namespace: "sonobuoy".to_string(),
        worker_image: "example.com/worker:latest".to_string(),
        image_pull_secret: None,
        bind_address: "127.0.0.1:0".parse().unwrap(),
        advertise_address: "127.0.0.1".to_string(),
        progress_port: 8099,
        k8s_version: "v1.24.0".to_string(),
        plugin_timeout: Duration::from_millis(50),
        liveness_poll_interval: Duration::from_millis(20),
        results_dir,
    }
}

/// SPEC_FULL.md §8 "expected-set completeness": one Job plugin plus one DaemonSet plugin
/// scheduled across two nodes must produce exactly three slots, all reaching a terminal state
/// (here, `timeout`, since nothing ever submits a result in this test).
#[tokio::test]
async fn expected_set_completeness_covers_job_and_daemonset_slots() {
    let dir = tempdir();
    let workload_manager = Arc::new(FakeWorkloadManager {
        nodes: vec!["node-1".to_string(), "node-2".to_string()],
    });
    let controller = RunController::new(test_config(dir.clone()), workload_manager);
    let plugins = vec![job_plugin("e2e"), daemonset_plugin("sysctl")];

    let handle = controller
        .run(plugins, std::future::pending())
        .await
        .expect("run should complete without a fatal error");

    let snapshot = handle.updater.snapshot().await.expect("owner is alive");
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.iter().all(|s| s.status.is_terminal()));

    let _ = std::fs::remove_dir_all(dir);
}

fn tempdir() -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("runctl-test-{}-{}", std::process::id(), nanos));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
