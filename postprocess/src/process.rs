use crate::error::{self, Result};
use crate::reader::{reader_for, Submission};
use model::constants::archive_paths;
use model::slot::{ExpectedResult, NodeKey, ResultStatus, SlotStatus};
use model::{Driver, PluginDefinition, ResultFormat, ResultItem};
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// One plugin's post-processing output: the assembled result tree (already written to
/// `sonobuoy_results.yaml` by `process_all`) and the per-slot verdict the caller should fold back
/// into the Expected Result set (SPEC_FULL.md §4.5 step 2).
pub struct PluginOutcome {
    pub plugin_name: String,
    pub tree: ResultItem,
    pub slot_results: Vec<(model::SlotKey, ResultStatus)>,
}

/// Runs the post-processor over every plugin's submitted artifacts and writes each plugin's
/// result tree into `results_dir` at its canonical archive path. `slots` is the full Expected
/// Result set for the run; only slots matching a given plugin are considered for that plugin.
pub fn process_all(
    plugins: &[PluginDefinition],
    slots: &[ExpectedResult],
    results_dir: &Path,
) -> Result<Vec<PluginOutcome>> {
    let mut outcomes = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let plugin_slots: Vec<&ExpectedResult> = slots
            .iter()
            .filter(|s| s.key.plugin_name == plugin.name)
            .collect();
        let outcome = process_plugin(plugin, &plugin_slots, results_dir)?;
        write_tree(results_dir, &outcome.plugin_name, &outcome.tree)?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Builds one plugin's result tree from its slots' submitted artifacts. Per-node node_keys are
/// visited in sorted order so the tree (and therefore the serialized YAML) is deterministic
/// regardless of submission arrival order (SPEC_FULL.md §4.5, §8).
fn process_plugin(
    plugin: &PluginDefinition,
    slots: &[&ExpectedResult],
    results_dir: &Path,
) -> Result<PluginOutcome> {
    let mut sorted = slots.to_vec();
    sorted.sort_by(|a, b| a.key.node_key.as_str().cmp(b.key.node_key.as_str()));

    let mut node_items = Vec::with_capacity(sorted.len());
    let mut slot_results = Vec::with_capacity(sorted.len());
    for slot in &sorted {
        let node_item = build_node_item(plugin, slot, results_dir);
        slot_results.push((slot.key.clone(), node_item.status.clone()));
        node_items.push(node_item);
    }

    let tree = match plugin.driver {
        Driver::Job => {
            // A Job plugin has exactly one slot (global); the tree root IS that slot's item,
            // never wrapped, so a manual override survives untouched to the top of the tree.
            node_items
                .into_iter()
                .next()
                .unwrap_or_else(|| ResultItem::leaf(plugin.name.clone(), ResultStatus::Unknown))
        }
        Driver::DaemonSet => ResultItem::branch(plugin.name.clone(), node_items),
    };

    Ok(PluginOutcome {
        plugin_name: plugin.name.clone(),
        tree,
        slot_results,
    })
}

/// Builds one node's (or "global"'s) contribution to the tree. Never returns an error: an
/// unreadable or unparseable artifact becomes a single `unknown` leaf carrying the failure in
/// `details`, per SPEC_FULL.md §7 ("post-processing error... never blocks archive assembly").
fn build_node_item(plugin: &PluginDefinition, slot: &ExpectedResult, results_dir: &Path) -> ResultItem {
    let node_name = slot.key.node_key.as_str().to_string();

    if let Some(status) = terminal_failure_status(slot) {
        let mut item = ResultItem::leaf(node_name, status);
        if let Some(message) = &slot.error_message {
            item.details.insert("error".to_string(), message.clone());
        }
        return item;
    }

    let filename = match &slot.filename {
        Some(f) => f,
        None => {
            let mut item = ResultItem::leaf(node_name, ResultStatus::Unknown);
            item.details
                .insert("error".to_string(), "no result was submitted for this slot".to_string());
            return item;
        }
    };

    match read_node_items(plugin, &slot.key.node_key, filename, slot.mime_type.as_deref(), results_dir) {
        Ok(items) => wrap_node_items(plugin, &node_name, items),
        Err(e) => {
            let mut item = ResultItem::leaf(node_name, ResultStatus::Unknown);
            item.details.insert("error".to_string(), e.to_string());
            item
        }
    }
}

/// `failed`/`timeout` slots never had a chance to submit an artifact; map the lifecycle status
/// directly to the leaf's result status. Returns `None` for slots that did (or might still)
/// produce a real artifact.
fn terminal_failure_status(slot: &ExpectedResult) -> Option<ResultStatus> {
    match slot.status {
        SlotStatus::Failed => Some(ResultStatus::Failed),
        SlotStatus::Timeout => Some(ResultStatus::Other("timeout".to_string())),
        _ => None,
    }
}

fn read_node_items(
    plugin: &PluginDefinition,
    node_key: &NodeKey,
    filename: &str,
    mime_type: Option<&str>,
    results_dir: &Path,
) -> Result<Vec<ResultItem>> {
    let dir = results_dir
        .join("plugins")
        .join(&plugin.name)
        .join("results")
        .join(node_key.as_str());
    let artifact = dir.join(filename);

    let submission_filename = match archive_kind(filename, mime_type) {
        Some(ArchiveKind::GzipTar) => {
            extract_in_place(&artifact, &dir, ArchiveKind::GzipTar)?;
            None
        }
        Some(ArchiveKind::Tar) => {
            extract_in_place(&artifact, &dir, ArchiveKind::Tar)?;
            None
        }
        None => Some(filename),
    };

    let submission = Submission {
        dir: &dir,
        filename: submission_filename,
    };
    reader_for(plugin.result_format, plugin.driver).read(&submission)
}

enum ArchiveKind {
    GzipTar,
    Tar,
}

fn archive_kind(filename: &str, mime_type: Option<&str>) -> Option<ArchiveKind> {
    if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        return Some(ArchiveKind::GzipTar);
    }
    if filename.ends_with(".tar") {
        return Some(ArchiveKind::Tar);
    }
    match mime_type {
        Some(m) if m.contains("gzip") => Some(ArchiveKind::GzipTar),
        Some(m) if m.contains("tar") => Some(ArchiveKind::Tar),
        _ => None,
    }
}

/// Extracts `artifact` into `dest_dir` (its own containing directory) and removes the original
/// tarball, so the directory holds only the member files a raw/junit walk should see.
fn extract_in_place(artifact: &Path, dest_dir: &Path, kind: ArchiveKind) -> Result<()> {
    let file = std::fs::File::open(artifact).context(error::ReadFileSnafu {
        path: artifact.to_path_buf(),
    })?;
    match kind {
        ArchiveKind::GzipTar => archive::extract_gzip_tar(file, dest_dir),
        ArchiveKind::Tar => archive::extract_tar(file, dest_dir),
    }
    .context(error::ExtractArtifactSnafu {
        path: artifact.to_path_buf(),
    })?;
    let _ = std::fs::remove_file(artifact);
    Ok(())
}

/// Wraps a node's parsed items into its tree contribution. A manual result that produced exactly
/// one item is that item itself, renamed to the node's key: its author-supplied `status` is an
/// explicit override and must not be recomputed by `ResultItem::branch` (SPEC_FULL.md §4.5).
fn wrap_node_items(plugin: &PluginDefinition, node_name: &str, mut items: Vec<ResultItem>) -> ResultItem {
    if matches!(plugin.result_format, ResultFormat::Manual) && items.len() == 1 {
        let mut item = items.remove(0);
        item.name = node_name.to_string();
        return item;
    }
    ResultItem::branch(node_name.to_string(), items)
}

fn write_tree(results_dir: &Path, plugin_name: &str, tree: &ResultItem) -> Result<()> {
    let yaml = serde_yaml::to_string(tree).context(error::SerializeTreeSnafu {
        plugin: plugin_name.to_string(),
    })?;
    let path: PathBuf = results_dir.join(archive_paths::plugin_result_tree(plugin_name));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context(error::WriteTreeSnafu {
            plugin: plugin_name.to_string(),
        })?;
    }
    std::fs::write(&path, yaml).context(error::WriteTreeSnafu {
        plugin: plugin_name.to_string(),
    })?;
    Ok(())
}
