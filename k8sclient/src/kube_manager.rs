use crate::error::{self, Result};
use crate::{PodPhase, PodSummary, WorkloadManager};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Node, Pod};
use kube::api::{AttachParams, DeleteParams, ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use log::debug;
use snafu::ResultExt;
use std::collections::BTreeMap;
use tokio::io::AsyncReadExt;

/// The real implementation of [`WorkloadManager`], backed by `kube::Client`.
pub struct KubeWorkloadManager {
    client: Client,
}

impl KubeWorkloadManager {
    pub async fn new_from_env() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context(error::ClientSetupSnafu)?;
        Ok(Self { client })
    }

    /// Builds a client from an explicit kubeconfig file rather than the default loading chain
    /// (`KUBECONFIG` env var, `~/.kube/config`, in-cluster config). Used by the CLI's `--kubeconfig`
    /// flag.
    pub async fn new_from_kubeconfig_path(path: &std::path::Path) -> Result<Self> {
        let kubeconfig = kube::config::Kubeconfig::read_from(path).context(error::ClientSetupSnafu)?;
        let options = kube::config::KubeConfigOptions::default();
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context(error::ClientSetupSnafu)?;
        let client = Client::try_from(config).context(error::ClientSetupSnafu)?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn pod_phase(pod: &Pod) -> PodPhase {
    let status = match &pod.status {
        Some(s) => s,
        None => return PodPhase::Pending,
    };
    match status.phase.as_deref() {
        Some("Running") => PodPhase::Running,
        Some("Succeeded") => PodPhase::Succeeded,
        Some("Failed") => {
            let reason = status
                .container_statuses
                .iter()
                .flatten()
                .filter_map(|c| c.state.as_ref())
                .filter_map(|s| s.terminated.as_ref())
                .map(|t| t.reason.clone().unwrap_or_else(|| "Unknown".to_string()))
                .next()
                .unwrap_or_else(|| "PodFailed".to_string());
            PodPhase::Failed { reason }
        }
        _ => PodPhase::Pending,
    }
}

#[async_trait]
impl WorkloadManager for KubeWorkloadManager {
    async fn create_job(&self, namespace: &str, job: Job) -> Result<Job> {
        let name = job.name_any();
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &job)
            .await
            .context(error::CreateSnafu {
                kind: "Job",
                name,
            })
    }

    async fn create_daemonset(&self, namespace: &str, daemonset: DaemonSet) -> Result<DaemonSet> {
        let name = daemonset.name_any();
        let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &daemonset)
            .await
            .context(error::CreateSnafu {
                kind: "DaemonSet",
                name,
            })
    }

    async fn create_configmap(&self, namespace: &str, configmap: ConfigMap) -> Result<ConfigMap> {
        let name = configmap.name_any();
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &configmap)
            .await
            .context(error::CreateSnafu {
                kind: "ConfigMap",
                name,
            })
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::background())
            .await
            .context(error::DeleteSnafu {
                kind: "Job",
                name,
            })?;
        Ok(())
    }

    async fn delete_daemonset(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::background())
            .await
            .context(error::DeleteSnafu {
                kind: "DaemonSet",
                name,
            })?;
        Ok(())
    }

    async fn delete_configmap(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::background())
            .await
            .context(error::DeleteSnafu {
                kind: "ConfigMap",
                name,
            })?;
        Ok(())
    }

    async fn matching_nodes(&self, selector: &BTreeMap<String, String>) -> Result<Vec<String>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let label_selector = selector
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        let mut params = ListParams::default();
        if !label_selector.is_empty() {
            params = params.labels(&label_selector);
        }
        let nodes = api.list(&params).await.context(error::ListSnafu {
            kind: "Node",
        })?;
        Ok(nodes.items.into_iter().map(|n| n.name_any()).collect())
    }

    async fn pods_for_workload(
        &self,
        namespace: &str,
        workload_name: &str,
    ) -> Result<Vec<PodSummary>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("app={}", workload_name));
        let pods = api.list(&params).await.context(error::ListSnafu {
            kind: "Pod",
        })?;
        Ok(pods
            .items
            .iter()
            .map(|pod| PodSummary {
                name: pod.name_any(),
                node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
                phase: pod_phase(pod),
            })
            .collect())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<String> {
        debug!("exec '{:?}' in {}/{} ({})", command, namespace, pod, container);
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = AttachParams::default().container(container).stdout(true);
        let mut attached = api
            .exec(pod, command, &params)
            .await
            .context(error::ExecSnafu {
                pod: pod.to_string(),
                container: container.to_string(),
            })?;
        let mut output = String::new();
        if let Some(mut stdout) = attached.stdout() {
            let _ = stdout.read_to_string(&mut output).await;
        }
        Ok(output)
    }
}
