use crate::error::{self, Result};
use snafu::{OptionExt, ResultExt};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the sidecar needs, read once at startup from the environment the launcher injects
/// (SPEC_FULL.md §4.1/§4.2). Mirrors `launcher::pod_builder`'s sidecar env variable names exactly
/// — the two sides of this boundary must never drift.
pub struct WorkerConfig {
    pub aggregator_url: String,
    pub result_type: String,
    pub plugin_name: String,
    /// `None` for a Job-driver plugin (submits under the "global" URL shape); `Some(node)` for a
    /// DaemonSet plugin, read from the pod's Downward API `NODE_NAME`.
    pub node_name: Option<String>,
    pub progress_port: u16,
    pub ca_cert_pem: String,
    pub client_cert_pem: String,
    pub client_key_pem: String,
    pub results_mount_path: PathBuf,
    /// Candidate filenames to look for under `results_mount_path` once the plugin signals done;
    /// tried in order, first one found wins.
    pub result_files: Vec<String>,
    pub done_poll_interval: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let progress_port: u16 = require_env("PROGRESS_PORT")?
            .parse()
            .context(error::InvalidEnvSnafu { name: "PROGRESS_PORT" })?;
        let result_files = require_env("RESULT_FILES")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let node_name = std::env::var("NODE_NAME").ok().filter(|s| !s.is_empty());

        Ok(Self {
            aggregator_url: require_env("AGGREGATOR_URL")?,
            result_type: require_env("RESULT_TYPE")?,
            plugin_name: require_env("PLUGIN_NAME")?,
            node_name,
            progress_port,
            ca_cert_pem: require_env("CA_CERT_PEM")?,
            client_cert_pem: require_env("CLIENT_CERT_PEM")?,
            client_key_pem: require_env("CLIENT_KEY_PEM")?,
            results_mount_path: PathBuf::from(require_env("RESULTS_MOUNT_PATH")?),
            result_files,
            done_poll_interval: Duration::from_secs(2),
        })
    }

    pub fn done_file_path(&self) -> PathBuf {
        self.results_mount_path.join(model::constants::DONE_FILE_NAME)
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .context(error::MissingEnvSnafu { name })
}
