/*!

A thin boundary around the Kubernetes API client, treated elsewhere in this workspace as an
opaque "workload manager" (SPEC_FULL.md §1): it can create and delete pods, daemonsets and
configmaps, enumerate nodes, and exec into running pods. Nothing upstream of this crate should
import `kube` directly.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

mod error;
mod kube_manager;

pub use error::{Error, Result};
pub use kube_manager::KubeWorkloadManager;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::ConfigMap;
use std::collections::BTreeMap;

/// The termination state of a pod, as observed by the liveness watcher (SPEC_FULL.md §4.4).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed { reason: String },
    /// The pod object no longer exists.
    Gone,
}

/// A minimal view of a plugin pod, enough for the liveness watcher to decide whether a slot
/// should be marked failed.
#[derive(Debug, Clone)]
pub struct PodSummary {
    pub name: String,
    pub node_name: Option<String>,
    pub phase: PodPhase,
}

/// The boundary contract every component above this crate relies on. Implemented against the
/// real cluster by [`KubeWorkloadManager`]; test code implements it with an in-memory fake.
#[async_trait]
pub trait WorkloadManager: Send + Sync {
    async fn create_job(&self, namespace: &str, job: Job) -> Result<Job>;
    async fn create_daemonset(&self, namespace: &str, daemonset: DaemonSet) -> Result<DaemonSet>;
    async fn create_configmap(&self, namespace: &str, configmap: ConfigMap) -> Result<ConfigMap>;

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;
    async fn delete_daemonset(&self, namespace: &str, name: &str) -> Result<()>;
    async fn delete_configmap(&self, namespace: &str, name: &str) -> Result<()>;

    /// Names of schedulable nodes whose labels satisfy `selector` (empty selector matches every
    /// schedulable node). Used to compute the expected-result set for DaemonSet plugins.
    async fn matching_nodes(&self, selector: &BTreeMap<String, String>) -> Result<Vec<String>>;

    /// Pods belonging to the named job/daemonset, one per node for a daemonset. Used by the
    /// liveness watcher.
    async fn pods_for_workload(&self, namespace: &str, workload_name: &str) -> Result<Vec<PodSummary>>;

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<String>;
}
