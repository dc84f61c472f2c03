use crate::config::WorkerConfig;
use crate::error::{self, Result};
use snafu::ResultExt;
use std::path::Path;

/// The artifact the worker submits to the aggregator: bytes, the filename the aggregator should
/// store it under, and its MIME type.
pub struct Artifact {
    pub body: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Locates and reads the plugin's result artifact once the `done` file has appeared
/// (SPEC_FULL.md §4.7). Tries each name in `result_files` in order; the first that exists under
/// the results mount wins. If `result_files` is empty, the plugin is assumed to have written
/// directly into the results mount and the whole directory is tarred up as the artifact.
pub fn locate(config: &WorkerConfig) -> Result<Artifact> {
    for candidate in &config.result_files {
        let path = config.results_mount_path.join(candidate);
        if path.exists() {
            return read_artifact(&path, candidate);
        }
    }
    if !config.result_files.is_empty() {
        return Err(error::Error::NoResultArtifact {
            candidates: config.result_files.clone(),
            mount: config.results_mount_path.clone(),
        });
    }
    tar_directory(&config.results_mount_path, "results")
}

fn read_artifact(path: &Path, name: &str) -> Result<Artifact> {
    if path.is_dir() {
        return tar_directory(path, name);
    }
    let body = std::fs::read(path).context(error::ReadArtifactSnafu { path: path.to_path_buf() })?;
    Ok(Artifact {
        body,
        filename: name.to_string(),
        content_type: content_type_for(name),
    })
}

fn tar_directory(dir: &Path, base_name: &str) -> Result<Artifact> {
    let mut body = Vec::new();
    archive::assemble(dir, &mut body).context(error::AssembleArtifactSnafu)?;
    Ok(Artifact {
        body,
        filename: format!("{}.tar.gz", base_name),
        content_type: "application/gzip".to_string(),
    })
}

fn content_type_for(filename: &str) -> String {
    if filename.ends_with(".xml") {
        "application/xml".to_string()
    } else if filename.ends_with(".yaml") || filename.ends_with(".yml") {
        "application/x-yaml".to_string()
    } else if filename.ends_with(".json") {
        "application/json".to_string()
    } else if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        "application/gzip".to_string()
    } else if filename.ends_with(".tar") {
        "application/x-tar".to_string()
    } else {
        "application/octet-stream".to_string()
    }
}
