use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::path::Path;

/// The typed front for the run's JSON configuration object (§6). Field names use `PascalCase` on
/// the wire to match the recognized keys listed in the spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub uuid: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub worker_image: String,
    #[serde(default = "default_pull_policy")]
    pub image_pull_policy: String,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub plugin_selections: Vec<String>,
    #[serde(default)]
    pub plugin_search_path: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub limits: Limits,
    pub query_dir: Option<String>,
    #[serde(default = "default_progress_port")]
    pub progress_updates_port: u16,
    #[serde(default)]
    pub security_context_mode: SecurityContextMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregationConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    pub advertise_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Limits {
    #[serde(default)]
    pub pod_logs: PodLogsLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PodLogsLimits {
    pub size_limit: Option<String>,
    pub time_limit: Option<String>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub field_selectors: BTreeMap<String, String>,
    #[serde(default)]
    pub label_selectors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityContextMode {
    Nonroot,
    None,
}

impl Default for SecurityContextMode {
    fn default() -> Self {
        SecurityContextMode::Nonroot
    }
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
fn default_results_dir() -> String {
    "/tmp/sonobuoy".to_string()
}
fn default_namespace() -> String {
    "sonobuoy".to_string()
}
fn default_pull_policy() -> String {
    "IfNotPresent".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_bind_port() -> u16 {
    8080
}
fn default_timeout_seconds() -> u64 {
    10800
}
fn default_progress_port() -> u16 {
    8099
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context(error::ParseConfigSnafu)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).context(error::ReadConfigFileSnafu {
            path: path.display().to_string(),
        })?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let raw = r#"{
            "WorkerImage": "example.com/worker:latest",
            "Aggregation": {}
        }"#;
        let config = Config::from_json_str(raw).unwrap();
        assert_eq!(config.namespace, "sonobuoy");
        assert_eq!(config.aggregation.bind_port, 8080);
        assert_eq!(config.aggregation.timeout_seconds, 10800);
        assert_eq!(config.security_context_mode, SecurityContextMode::Nonroot);
    }

    #[test]
    fn explicit_aggregation_fields_override_defaults() {
        let raw = r#"{
            "WorkerImage": "example.com/worker:latest",
            "Aggregation": {"BindPort": 9090, "BindAddress": "127.0.0.1", "TimeoutSeconds": 60}
        }"#;
        let config = Config::from_json_str(raw).unwrap();
        assert_eq!(config.aggregation.bind_port, 9090);
        assert_eq!(config.aggregation.bind_address, "127.0.0.1");
        assert_eq!(config.aggregation.timeout_seconds, 60);
    }
}
