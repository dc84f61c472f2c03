use crate::{k8s, plugins};
use anyhow::{Context, Result};
use clap::Parser;
use model::plugin::Driver;
use model::Config;
use std::path::PathBuf;

/// Remove the in-cluster objects a run created, by recomputing their names the same way the
/// launcher built them rather than tracking them separately.
#[derive(Debug, Parser)]
pub(crate) struct Delete {
    /// Path to the run's JSON configuration file, for its namespace.
    #[clap(long)]
    config: PathBuf,

    /// Path to the YAML or JSON file of plugin definitions the run used.
    #[clap(long)]
    plugins: PathBuf,
}

impl Delete {
    pub(crate) async fn run(self, kubeconfig: Option<PathBuf>) -> Result<i32> {
        let config = Config::from_file(&self.config)
            .with_context(|| format!("unable to read config '{}'", self.config.display()))?;
        let plugin_set = plugins::load(&self.plugins, &config.plugin_selections)?;
        let workload_manager = k8s::workload_manager(kubeconfig.as_deref()).await?;

        let mut any_error = false;
        for plugin in &plugin_set {
            let workload_result = match plugin.driver {
                Driver::Job => workload_manager.delete_job(&config.namespace, &plugin.name).await,
                Driver::DaemonSet => {
                    workload_manager
                        .delete_daemonset(&config.namespace, &plugin.name)
                        .await
                }
            };
            if let Err(err) = workload_result {
                log::warn!("unable to delete {} '{}': {}", driver_kind(plugin.driver), plugin.name, err);
                any_error = true;
            }

            if !plugin.configmap.is_empty() {
                let name = format!("{}-config", plugin.name);
                if let Err(err) = workload_manager.delete_configmap(&config.namespace, &name).await {
                    log::warn!("unable to delete configmap '{}': {}", name, err);
                    any_error = true;
                }
            }
        }

        Ok(if any_error { 2 } else { 0 })
    }
}

fn driver_kind(driver: Driver) -> &'static str {
    match driver {
        Driver::Job => "job",
        Driver::DaemonSet => "daemonset",
    }
}
