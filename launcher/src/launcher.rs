use crate::cert::RunCertificateAuthority;
use crate::error::{self, Result};
use crate::pod_builder::PluginPodBuilder;
use crate::template::TokenValues;
use k8sclient::WorkloadManager;
use log::{info, warn};
use model::plugin::{Driver, PluginDefinition};
use model::slot::{ExpectedResult, NodeKey, SlotKey};
use snafu::ResultExt;
use std::sync::Arc;

/// Static configuration the launcher needs for every plugin in a run, independent of any single
/// plugin's definition.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub namespace: String,
    pub worker_image: String,
    pub image_pull_secret: Option<String>,
    pub aggregator_url: String,
    pub progress_port: u16,
    pub k8s_version: String,
}

/// Translates plugin definitions plus injected environment into workload objects submitted to
/// the cluster workload manager (SPEC_FULL.md §4.2). Holds the run's certificate authority so
/// every plugin's client identity is issued from the same root.
pub struct WorkloadLauncher {
    config: LauncherConfig,
    ca: RunCertificateAuthority,
    workload_manager: Arc<dyn WorkloadManager>,
}

/// The outcome of launching one plugin: either the expected results it now owns, or the error
/// that should immediately mark those results failed (SPEC_FULL.md §4.2 failure semantics).
pub enum LaunchOutcome {
    Scheduled(Vec<ExpectedResult>),
    Failed {
        slots: Vec<ExpectedResult>,
        message: String,
    },
}

impl WorkloadLauncher {
    pub fn new(config: LauncherConfig, workload_manager: Arc<dyn WorkloadManager>) -> Result<Self> {
        let ca = RunCertificateAuthority::generate()?;
        Ok(Self {
            config,
            ca,
            workload_manager,
        })
    }

    pub fn ca_cert_pem(&self) -> Result<String> {
        self.ca.ca_cert_pem()
    }

    /// Server certificate for the aggregator's HTTPS listener, chained to this run's CA. Exposed
    /// so the run controller can bind the aggregation server before any plugin is launched
    /// (SPEC_FULL.md §4.4 startup step 3), using the same CA every issued client cert chains to.
    pub fn issue_server_identity(&self, advertise_address: &str) -> Result<crate::cert::ClientIdentity> {
        self.ca.issue_server_cert(advertise_address)
    }

    /// The node keys a plugin will produce slots for: `[Global]` for a Job, one per matching node
    /// for a DaemonSet. Exposed so the run controller can compute the full expected-result set
    /// (SPEC_FULL.md §4.4 startup step 1) before any certificate is issued or workload submitted.
    pub async fn node_keys(&self, plugin: &PluginDefinition) -> Result<Vec<NodeKey>> {
        match plugin.driver {
            Driver::Job => Ok(vec![NodeKey::Global]),
            Driver::DaemonSet => {
                let selector = plugin.node_selector.clone().unwrap_or_default();
                let nodes = self
                    .workload_manager
                    .matching_nodes(&selector)
                    .await
                    .context(error::EnumerateNodesSnafu {
                        plugin: plugin.name.clone(),
                    })?;
                Ok(nodes.into_iter().map(NodeKey::Node).collect())
            }
        }
    }

    /// Issues the client certificate a plugin's worker sidecars authenticate with. Exposed
    /// alongside [`Self::node_keys`] so the controller can populate the slot table's fingerprints
    /// before the aggregation server starts accepting connections.
    pub fn issue_client_identity(&self, plugin_name: &str) -> Result<crate::cert::ClientIdentity> {
        self.ca.issue_client_cert(plugin_name)
    }

    /// Launches one plugin: computes its expected-result slots, issues its client certificate,
    /// builds and submits its configmap (if any) and its Job/DaemonSet, and returns the slots the
    /// caller should insert into the run's slot table. On any scheduling failure, returns
    /// `LaunchOutcome::Failed` with slots already marked so the caller can record them without
    /// aborting the whole run.
    pub async fn launch(&self, plugin: &PluginDefinition) -> Result<LaunchOutcome> {
        let node_keys = self.node_keys(plugin).await?;
        let identity = self.ca.issue_client_cert(&plugin.name)?;
        self.launch_with(plugin, node_keys, identity).await
    }

    /// Builds and submits a plugin's workload given an already-computed node-key set and
    /// already-issued client identity, without re-enumerating nodes or re-issuing a certificate.
    /// Used by the run controller once the full expected-result set has been precomputed
    /// (SPEC_FULL.md §4.4 startup steps 1-2 happen once, up front, for every plugin).
    pub async fn launch_with(
        &self,
        plugin: &PluginDefinition,
        node_keys: Vec<NodeKey>,
        identity: crate::cert::ClientIdentity,
    ) -> Result<LaunchOutcome> {
        let mut slots: Vec<ExpectedResult> = node_keys
            .iter()
            .map(|key| ExpectedResult::new(SlotKey::new(plugin.name.clone(), key.clone())))
            .collect();
        for slot in &mut slots {
            slot.client_cert_fingerprint = Some(identity.fingerprint.clone());
        }

        let tokens = TokenValues::new()
            .set("aggregator_url", self.config.aggregator_url.clone())
            .set("result_type", plugin.name.clone())
            .set("plugin_name", plugin.name.clone())
            .set("progress_port", self.config.progress_port.to_string())
            .set("k8s_version", self.config.k8s_version.clone());

        let ca_cert_pem = self.ca_cert_pem()?;
        let builder = PluginPodBuilder {
            plugin,
            sidecar_image: self.config.worker_image.clone(),
            pull_secret: self.config.image_pull_secret.clone(),
            tokens: &tokens,
            identity: &identity,
            ca_cert_pem,
            progress_port: self.config.progress_port,
        };

        if let Some(configmap) = builder.build_configmap() {
            if let Err(e) = self
                .workload_manager
                .create_configmap(&self.config.namespace, configmap)
                .await
            {
                warn!("configmap creation failed for '{}': {}", plugin.name, e);
                return Ok(Self::fail_all(slots, e.to_string()));
            }
        }

        let schedule_result = match plugin.driver {
            Driver::Job => self
                .workload_manager
                .create_job(&self.config.namespace, builder.build_job())
                .await
                .map(|_| ()),
            Driver::DaemonSet => self
                .workload_manager
                .create_daemonset(&self.config.namespace, builder.build_daemonset())
                .await
                .map(|_| ()),
        };

        match schedule_result {
            Ok(()) => {
                info!("scheduled plugin '{}' ({} slot(s))", plugin.name, slots.len());
                Ok(LaunchOutcome::Scheduled(slots))
            }
            Err(e) => {
                warn!("scheduling failed for plugin '{}': {}", plugin.name, e);
                Ok(Self::fail_all(slots, e.to_string()))
            }
        }
    }

    fn fail_all(mut slots: Vec<ExpectedResult>, message: String) -> LaunchOutcome {
        for slot in &mut slots {
            slot.status = model::slot::SlotStatus::Failed;
            slot.error_message = Some(message.clone());
        }
        LaunchOutcome::Failed {
            slots,
            message,
        }
    }
}
