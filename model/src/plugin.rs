use crate::constants::DEFAULT_COMMAND;
use crate::error::{self, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::collections::BTreeMap;

/// How a plugin is scheduled across the cluster.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Driver {
    /// Runs once, anywhere in the cluster, producing a single global result.
    Job,
    /// Runs once per schedulable node matching the plugin's node selector.
    DaemonSet,
}

/// How a plugin's submitted artifact should be interpreted by the post-processor.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// JUnit XML, one file per testsuite run.
    Junit,
    /// A Sonobuoy-native result-item YAML document, ingested verbatim.
    Manual,
    /// An arbitrary file or directory tree, walked file-by-file.
    Raw,
}

impl Default for ResultFormat {
    fn default() -> Self {
        ResultFormat::Raw
    }
}

/// The plugin container's image, entrypoint, and environment, as the launcher will render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables, values may contain template tokens (see `constants::ALL_TOKENS`).
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A plugin definition, validated once at load time before any workload is launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub name: String,
    pub driver: Driver,
    #[serde(default)]
    pub result_format: ResultFormat,
    /// Hint list of filenames the plugin is expected to produce, used by the worker sidecar to
    /// locate the artifact when the plugin does not write directly to the results mount.
    #[serde(default)]
    pub result_files: Vec<String>,
    pub source_url: Option<String>,
    pub description: Option<String>,
    pub container: ContainerSpec,
    /// Required labels a node must carry for a DaemonSet plugin to be scheduled on it. Ignored
    /// for Job plugins (see `PluginDefinition::validate`).
    pub node_selector: Option<BTreeMap<String, String>>,
    /// An escape hatch letting a plugin author supply a full pod template override; when present
    /// the launcher still injects the worker sidecar and mTLS material but otherwise defers to
    /// the caller's template verbatim.
    pub pod_spec_override: Option<serde_json::Value>,
    /// Filename -> contents, mounted at `constants::CONFIG_MOUNT_PATH/<filename>`.
    #[serde(default)]
    pub configmap: BTreeMap<String, String>,
}

impl PluginDefinition {
    /// Validates the invariants from the data model: name charset, required fields, and the
    /// Job/DaemonSet node-selector constraint. Called once per plugin at load time; any failure
    /// here is a configuration error that aborts the run before any workload is scheduled.
    pub fn validate(&self) -> Result<()> {
        let name_re = Regex::new("^[a-z0-9-]+$").expect("static regex is valid");
        ensure!(
            name_re.is_match(&self.name),
            error::InvalidPluginName { name: &self.name }
        );
        ensure!(
            !self.container.image.is_empty(),
            error::MissingField {
                name: &self.name,
                field: "container.image",
            }
        );
        if matches!(self.driver, Driver::Job) {
            ensure!(
                self.node_selector.is_none(),
                error::JobWithNodeSelector { name: &self.name }
            );
        }
        Ok(())
    }

    /// The command to exec in the plugin container, falling back to `constants::DEFAULT_COMMAND`.
    pub fn command(&self) -> Vec<String> {
        if self.container.command.is_empty() {
            DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()
        } else {
            self.container.command.clone()
        }
    }

    /// Validates a full set of plugins: each individually, and uniqueness of names across the
    /// set.
    pub fn validate_set(plugins: &[PluginDefinition]) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for plugin in plugins {
            plugin.validate()?;
            ensure!(
                seen.insert(plugin.name.clone()),
                error::DuplicatePlugin {
                    name: plugin.name.clone(),
                }
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(name: &str, driver: Driver) -> PluginDefinition {
        PluginDefinition {
            name: name.to_string(),
            driver,
            result_format: ResultFormat::default(),
            result_files: Vec::new(),
            source_url: None,
            description: None,
            container: ContainerSpec {
                image: "example.com/plugin:latest".to_string(),
                command: Vec::new(),
                args: Vec::new(),
                env: BTreeMap::new(),
            },
            node_selector: None,
            pod_spec_override: None,
            configmap: BTreeMap::new(),
        }
    }

    #[test]
    fn valid_job_plugin_passes() {
        assert!(plugin("e2e", Driver::Job).validate().is_ok());
    }

    #[test]
    fn uppercase_name_rejected() {
        let err = plugin("E2E", Driver::Job).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidPluginName { .. }));
    }

    #[test]
    fn missing_image_rejected() {
        let mut p = plugin("e2e", Driver::Job);
        p.container.image = String::new();
        assert!(matches!(
            p.validate().unwrap_err(),
            Error::MissingField { .. }
        ));
    }

    #[test]
    fn job_with_node_selector_rejected() {
        let mut p = plugin("e2e", Driver::Job);
        p.node_selector = Some(maplit::btreemap! { "kubernetes.io/os".to_string() => "linux".to_string() });
        assert!(matches!(
            p.validate().unwrap_err(),
            Error::JobWithNodeSelector { .. }
        ));
    }

    #[test]
    fn default_command_used_when_empty() {
        let p = plugin("e2e", Driver::Job);
        assert_eq!(p.command(), vec!["./run.sh".to_string()]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let plugins = vec![plugin("e2e", Driver::Job), plugin("e2e", Driver::DaemonSet)];
        assert!(matches!(
            PluginDefinition::validate_set(&plugins).unwrap_err(),
            Error::DuplicatePlugin { .. }
        ));
    }
}
