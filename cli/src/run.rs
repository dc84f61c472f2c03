use crate::{k8s, plugins};
use anyhow::{Context, Result};
use clap::Parser;
use model::constants::archive_paths;
use model::slot::{ResultStatus, SlotStatus};
use model::{Config, RunInfo};
use runctl::{RunController, RunControllerConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

const LIVENESS_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_K8S_VERSION: &str = "v1.24.0";

/// Launch a Sonobuoy run and wait for it to finish.
#[derive(Debug, Parser)]
pub(crate) struct Run {
    /// Path to the run's JSON configuration file (SPEC_FULL.md §6).
    #[clap(long)]
    config: PathBuf,

    /// Path to a YAML or JSON file containing the plugin definitions to run.
    #[clap(long)]
    plugins: PathBuf,

    /// Override the results directory recorded in the config file.
    #[clap(long)]
    results_dir: Option<PathBuf>,

    /// Where to write the final archive.
    #[clap(long, default_value = "results.tar.gz")]
    output: PathBuf,
}

impl Run {
    pub(crate) async fn run(self, kubeconfig: Option<PathBuf>) -> Result<i32> {
        let config = Config::from_file(&self.config)
            .with_context(|| format!("unable to read config '{}'", self.config.display()))?;
        let plugin_set = plugins::load(&self.plugins, &config.plugin_selections)?;
        let results_dir = self
            .results_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.results_dir));
        std::fs::create_dir_all(&results_dir)
            .with_context(|| format!("unable to create results directory '{}'", results_dir.display()))?;

        let workload_manager = k8s::workload_manager(kubeconfig.as_deref()).await?;

        let bind_address = format!("{}:{}", config.aggregation.bind_address, config.aggregation.bind_port)
            .parse()
            .context("invalid Aggregation.BindAddress/BindPort")?;
        let advertise_address = config
            .aggregation
            .advertise_address
            .clone()
            .unwrap_or_else(|| config.aggregation.bind_address.clone());

        let controller_config = RunControllerConfig {
            namespace: config.namespace.clone(),
            worker_image: config.worker_image.clone(),
            image_pull_secret: config.image_pull_secrets.first().cloned(),
            bind_address,
            advertise_address,
            progress_port: config.progress_updates_port,
            k8s_version: DEFAULT_K8S_VERSION.to_string(),
            plugin_timeout: Duration::from_secs(config.aggregation.timeout_seconds),
            liveness_poll_interval: LIVENESS_POLL_INTERVAL,
            results_dir: results_dir.clone(),
        };

        let mut run_info = RunInfo::start(
            plugin_set.iter().map(|p| p.name.clone()).collect(),
            env!("CARGO_PKG_VERSION"),
        );

        let controller = RunController::new(controller_config, workload_manager);
        let cancel = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let handle = controller
            .run(plugin_set.clone(), cancel)
            .await
            .context("run failed before post-processing could start")?;
        let snapshot = handle
            .updater
            .snapshot()
            .await
            .context("slot owner is no longer reachable")?;

        write_plugin_definitions(&results_dir, &plugin_set)?;
        write_error_files(&results_dir, &snapshot)?;

        let outcomes = postprocess::process_all(&plugin_set, &snapshot, &results_dir)
            .context("post-processing failed")?;

        run_info.finish();
        write_meta(&results_dir, &config, &run_info)?;

        let mut result_status_by_slot: BTreeMap<String, ResultStatus> = BTreeMap::new();
        for outcome in &outcomes {
            for (key, status) in &outcome.slot_results {
                result_status_by_slot.insert(key.to_string(), status.clone());
            }
        }
        write_run_state(&results_dir, &snapshot, &result_status_by_slot)?;

        let output_file = std::fs::File::create(&self.output)
            .with_context(|| format!("unable to create archive '{}'", self.output.display()))?;
        archive::assemble(&results_dir, output_file).context("unable to assemble archive")?;

        print_summary(&snapshot, &result_status_by_slot);

        let any_failed = outcomes
            .iter()
            .any(|o| !matches!(o.tree.status, ResultStatus::Passed));
        Ok(if any_failed { 1 } else { 0 })
    }
}

fn write_plugin_definitions(results_dir: &std::path::Path, plugins: &[model::PluginDefinition]) -> Result<()> {
    for plugin in plugins {
        let path = results_dir.join(archive_paths::plugin_definition(&plugin.name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(plugin)?;
        std::fs::write(&path, bytes).with_context(|| format!("unable to write '{}'", path.display()))?;
    }
    Ok(())
}

/// Writes `plugins/<name>/errors/<node>.json` for every slot that never produced a result file
/// (SPEC_FULL.md §8 "archive completeness": every terminal slot has results or an error, never
/// both, never neither).
fn write_error_files(results_dir: &std::path::Path, snapshot: &[model::ExpectedResult]) -> Result<()> {
    for slot in snapshot {
        if slot.filename.is_some() {
            continue;
        }
        if !matches!(slot.status, SlotStatus::Failed | SlotStatus::Timeout) {
            continue;
        }
        let message = slot.error_message.clone().unwrap_or_else(|| match slot.status {
            SlotStatus::Timeout => "plugin did not submit a result before its timeout".to_string(),
            _ => "plugin did not submit a result".to_string(),
        });
        let path = results_dir.join(archive_paths::plugin_error(&slot.key.plugin_name, slot.key.node_key.as_str()));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::json!({ "error": message });
        std::fs::write(&path, serde_json::to_vec_pretty(&body)?)
            .with_context(|| format!("unable to write '{}'", path.display()))?;
    }
    Ok(())
}

fn write_meta(results_dir: &std::path::Path, config: &Config, run_info: &RunInfo) -> Result<()> {
    let meta_dir = results_dir.join("meta");
    std::fs::create_dir_all(&meta_dir)?;
    std::fs::write(
        results_dir.join(archive_paths::META_CONFIG),
        serde_json::to_vec_pretty(config)?,
    )?;
    std::fs::write(
        results_dir.join(archive_paths::META_INFO),
        serde_json::to_vec_pretty(run_info)?,
    )?;
    std::fs::write(
        results_dir.join(archive_paths::META_QUERY_TIME),
        serde_json::to_vec_pretty(&serde_json::json!({ "queried": chrono::Utc::now().to_rfc3339() }))?,
    )?;
    Ok(())
}

/// A snapshot `status` reads from disk: the terminal slot table merged with the post-processor's
/// result-status assignment (SPEC_FULL.md §4.5 step 2).
#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct SlotStatusRow {
    pub plugin: String,
    pub node: String,
    pub status: SlotStatus,
    pub result_status: Option<ResultStatus>,
    pub error_message: Option<String>,
}

fn write_run_state(
    results_dir: &std::path::Path,
    snapshot: &[model::ExpectedResult],
    result_status_by_slot: &BTreeMap<String, ResultStatus>,
) -> Result<()> {
    let rows: Vec<SlotStatusRow> = snapshot
        .iter()
        .map(|slot| SlotStatusRow {
            plugin: slot.key.plugin_name.clone(),
            node: slot.key.node_key.as_str().to_string(),
            status: slot.status,
            result_status: result_status_by_slot
                .get(&slot.key.to_string())
                .cloned()
                .or_else(|| slot.result_status.clone()),
            error_message: slot.error_message.clone(),
        })
        .collect();
    let path = results_dir.join("meta").join("run-state.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&rows)?)
        .with_context(|| format!("unable to write '{}'", path.display()))
}

fn print_summary(snapshot: &[model::ExpectedResult], result_status_by_slot: &BTreeMap<String, ResultStatus>) {
    for slot in snapshot {
        let result_status = result_status_by_slot
            .get(&slot.key.to_string())
            .cloned()
            .unwrap_or(ResultStatus::Unknown);
        println!("{}\t{:?}\t{}", slot.key, slot.status, result_status);
    }
}
