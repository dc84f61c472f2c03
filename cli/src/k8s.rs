use anyhow::{Context, Result};
use k8sclient::KubeWorkloadManager;
use std::path::Path;
use std::sync::Arc;

/// Builds the workload manager the rest of the CLI talks to, from the `--kubeconfig` flag (or the
/// default loading chain when it is not given).
pub(crate) async fn workload_manager(kubeconfig: Option<&Path>) -> Result<Arc<dyn k8sclient::WorkloadManager>> {
    let manager = match kubeconfig {
        Some(path) => KubeWorkloadManager::new_from_kubeconfig_path(path)
            .await
            .with_context(|| format!("unable to build a k8s client from kubeconfig '{}'", path.display()))?,
        None => KubeWorkloadManager::new_from_env()
            .await
            .context("unable to build a default k8s client")?,
    };
    Ok(Arc::new(manager))
}
