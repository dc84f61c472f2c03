use crate::error::{self, Result};
use crate::liveness;
use crate::state::RunState;
use crate::timeout;
use aggregator::{self, SlotUpdater};
use k8sclient::WorkloadManager;
use launcher::{LaunchOutcome, LauncherConfig, WorkloadLauncher};
use log::{error, info, warn};
use model::plugin::PluginDefinition;
use model::slot::{ExpectedResult, SlotKey};
use snafu::{ensure, ResultExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything the controller needs that is not itself derived from the plugin set
/// (SPEC_FULL.md §6 configuration keys, renamed to idiomatic field names).
#[derive(Debug, Clone)]
pub struct RunControllerConfig {
    pub namespace: String,
    pub worker_image: String,
    pub image_pull_secret: Option<String>,
    pub bind_address: SocketAddr,
    pub advertise_address: String,
    pub progress_port: u16,
    pub k8s_version: String,
    pub plugin_timeout: Duration,
    pub liveness_poll_interval: Duration,
    pub results_dir: PathBuf,
}

/// Everything a caller needs once a run is underway: the live slot table, and the run's CA
/// certificate (callers retrieving the archive need it to mint their own retrieval client cert
/// in a fuller deployment; here it is surfaced so the CLI can display it).
pub struct RunHandle {
    pub updater: SlotUpdater,
    pub ca_cert_pem: String,
    pub state: RunState,
}

/// Owns the lifecycle of one run end to end (SPEC_FULL.md §4.4): computes the expected-result
/// set, issues certificates, starts the aggregation server, launches workloads, and runs the
/// liveness and timeout watchdogs until every slot is terminal or the run is cancelled.
pub struct RunController {
    config: RunControllerConfig,
    workload_manager: Arc<dyn WorkloadManager>,
}

impl RunController {
    pub fn new(config: RunControllerConfig, workload_manager: Arc<dyn WorkloadManager>) -> Self {
        Self {
            config,
            workload_manager,
        }
    }

    /// Drives a run through `initializing` and `running`. Returns once every slot has reached a
    /// terminal state or `cancel` resolves; the caller (typically the CLI's `run` command) is
    /// responsible for post-processing and archive assembly afterward using the returned
    /// `SlotUpdater`'s final snapshot.
    pub async fn run(
        &self,
        plugins: Vec<PluginDefinition>,
        cancel: impl std::future::Future<Output = ()>,
    ) -> Result<RunHandle> {
        PluginDefinition::validate_set(&plugins).context(error::InvalidPluginsSnafu)?;

        // Step 1 (SPEC_FULL.md §4.4): a startup-phase failure here is fatal, before any workload
        // is scheduled.
        let launcher_config = LauncherConfig {
            namespace: self.config.namespace.clone(),
            worker_image: self.config.worker_image.clone(),
            image_pull_secret: self.config.image_pull_secret.clone(),
            aggregator_url: format!(
                "https://{}:{}",
                self.config.advertise_address,
                self.config.bind_address.port()
            ),
            progress_port: self.config.progress_port,
            k8s_version: self.config.k8s_version.clone(),
        };
        let launcher = WorkloadLauncher::new(launcher_config, self.workload_manager.clone())?;
        let ca_cert_pem = launcher.ca_cert_pem()?;

        let mut plugin_node_keys = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            let node_keys = launcher.node_keys(plugin).await?;
            plugin_node_keys.push(node_keys);
        }

        // Step 2: issue the client identity for every plugin before the server is reachable, so
        // every slot's fingerprint is already on file the instant the first worker connects.
        // Kept aligned with `plugins` by index rather than a name-keyed map, so step 4 below
        // never needs to fall back to a panicking lookup.
        let mut identities = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            identities.push(launcher.issue_client_identity(&plugin.name)?);
        }

        let mut initial_slots = HashMap::new();
        for ((plugin, node_keys), identity) in plugins.iter().zip(&plugin_node_keys).zip(&identities) {
            let fingerprint = identity.fingerprint.clone();
            for node_key in node_keys {
                let key = SlotKey::new(plugin.name.clone(), node_key.clone());
                let mut slot = ExpectedResult::new(key.clone());
                slot.client_cert_fingerprint = Some(fingerprint.clone());
                initial_slots.insert(key, slot);
            }
        }

        // Step 3: start the aggregation server and wait for its listen address to be ready
        // before launching anything that might connect to it.
        let server_identity = launcher.issue_server_identity(&self.config.advertise_address)?;
        let tls_config = aggregator::tls::server_config(&ca_cert_pem, &server_identity.cert_pem, &server_identity.key_pem)?;
        let updater = SlotUpdater::spawn(initial_slots);
        let app = aggregator::router(updater.clone(), self.config.results_dir.clone());
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let bind_address = self.config.bind_address;
        tokio::spawn(async move {
            if let Err(e) = aggregator::serve(bind_address, tls_config, app, Some(ready_tx)).await {
                error!("aggregation server exited: {}", e);
            }
        });
        let _ = ready_rx.await;

        // Step 4: launch workloads in the order plugins were specified. A single plugin's
        // scheduling failure marks its own slots failed and the run continues.
        let mut any_scheduled = false;
        for ((plugin, node_keys), identity) in plugins
            .iter()
            .zip(plugin_node_keys.iter().cloned())
            .zip(identities)
        {
            match launcher.launch_with(plugin, node_keys, identity).await {
                Ok(LaunchOutcome::Scheduled(_)) => {
                    any_scheduled = true;
                    info!("plugin '{}' scheduled", plugin.name);
                }
                Ok(LaunchOutcome::Failed { slots, message }) => {
                    warn!("plugin '{}' failed to schedule: {}", plugin.name, message);
                    for slot in slots {
                        let key = slot.key.clone();
                        let _ = updater.liveness_failed(key, message.clone()).await;
                    }
                }
                Err(e) => {
                    warn!("plugin '{}' launch error: {}", plugin.name, e);
                }
            }
        }
        ensure!(any_scheduled || plugins.is_empty(), error::AllPluginsFailedSnafu);

        // Step 5: start the watchdogs.
        let plugin_names: Vec<String> = plugins.iter().map(|p| p.name.clone()).collect();
        let all_keys: Vec<SlotKey> = plugins
            .iter()
            .zip(&plugin_node_keys)
            .flat_map(|(plugin, keys)| {
                keys.iter()
                    .map(move |k| SlotKey::new(plugin.name.clone(), k.clone()))
            })
            .collect();

        let liveness_handle = tokio::spawn(liveness::watch(
            self.workload_manager.clone(),
            self.config.namespace.clone(),
            plugin_names,
            updater.clone(),
            self.config.liveness_poll_interval,
        ));
        let timeout_handle = tokio::spawn(timeout::watch(updater.clone(), self.config.plugin_timeout, all_keys));

        tokio::select! {
            _ = updater.wait_all_terminal() => {
                info!("all slots reached a terminal state");
            }
            _ = cancel => {
                info!("run cancelled, proceeding to post-processing over partial results");
            }
        }
        liveness_handle.abort();
        timeout_handle.abort();

        Ok(RunHandle {
            updater,
            ca_cert_pem,
            state: RunState::PostProcessing,
        })
    }
}

