use aggregator::SlotUpdater;
use k8sclient::{PodPhase, WorkloadManager};
use log::warn;
use model::slot::{NodeKey, SlotKey};
use std::sync::Arc;
use std::time::Duration;

/// Re-examines every plugin's pods on a fixed cadence; if a pod has terminated and its slot
/// never received a result, marks the slot `failed` with the pod's termination reason
/// (SPEC_FULL.md §4.4, §5 "pod liveness watcher"). Runs until the updater's terminal signal
/// fires, so it naturally stops once the run has nothing left to watch.
pub async fn watch(
    workload_manager: Arc<dyn WorkloadManager>,
    namespace: String,
    plugin_names: Vec<String>,
    updater: SlotUpdater,
    poll_interval: Duration,
) {
    let mut interval = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = updater.wait_all_terminal() => return,
        }

        let snapshot = match updater.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };

        for plugin_name in &plugin_names {
            let pods = match workload_manager.pods_for_workload(&namespace, plugin_name).await {
                Ok(pods) => pods,
                Err(e) => {
                    warn!("liveness check failed for plugin '{}': {}", plugin_name, e);
                    continue;
                }
            };
            for pod in pods {
                let reason = match pod.phase {
                    PodPhase::Failed { reason } => reason,
                    PodPhase::Gone => "pod no longer exists".to_string(),
                    PodPhase::Succeeded | PodPhase::Pending | PodPhase::Running => continue,
                };
                let node_key = match &pod.node_name {
                    Some(node) => NodeKey::Node(node.clone()),
                    None => NodeKey::Global,
                };
                let key = SlotKey::new(plugin_name.clone(), node_key);
                let still_pending = snapshot
                    .iter()
                    .find(|slot| slot.key == key)
                    .map(|slot| !slot.status.is_terminal())
                    .unwrap_or(false);
                if still_pending {
                    if let Err(e) = updater.liveness_failed(key.clone(), reason).await {
                        warn!("unable to record liveness failure for '{}': {}", key, e);
                        return;
                    }
                }
            }
        }
    }
}
