use anyhow::{Context, Result};
use model::plugin::PluginDefinition;
use std::path::Path;

/// Loads a plugin set from a YAML (or JSON, which is valid YAML) file of plugin definitions, and
/// narrows it to `selections` when the run configuration names specific plugins.
///
/// Parsing the plugin's own result-bearing fields is this crate's job; interpreting a richer
/// manifest format on top of that is explicitly out of scope (SPEC_FULL.md §1).
pub(crate) fn load(path: &Path, selections: &[String]) -> Result<Vec<PluginDefinition>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read plugin file '{}'", path.display()))?;
    let mut plugins: Vec<PluginDefinition> = serde_yaml::from_str(&raw)
        .with_context(|| format!("unable to parse plugin definitions in '{}'", path.display()))?;

    if !selections.is_empty() {
        plugins.retain(|p| selections.iter().any(|name| name == &p.name));
    }

    model::plugin::PluginDefinition::validate_set(&plugins).context("invalid plugin set")?;
    Ok(plugins)
}
