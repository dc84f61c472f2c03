use crate::error::{self, Result};
use crate::path_safety::{is_safe_member_path, to_posix_member_name};
use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use log::warn;
use snafu::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a gzipped tar of `results_dir` to `out`, preserving the relative layout described in
/// SPEC_FULL.md §3. Streaming: `out` is written to incrementally, never buffered in full
/// (SPEC_FULL.md §4.6). Deterministic: members are added in lexicographic order of their
/// relative path, with normalized mode bits and a fixed mtime, so identical input directories
/// produce byte-identical output (§8 "determinism of post-processing" extends to assembly).
pub fn assemble<W: Write>(results_dir: &Path, out: W) -> Result<()> {
    let gz = GzBuilder::new().mtime(0).write(out, Compression::default());
    let mut builder = tar::Builder::new(gz);
    builder.mode(tar::HeaderMode::Deterministic);

    let mut relative_paths: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(results_dir) {
        let entry = entry.context(error::WalkSnafu {
            path: results_dir.to_path_buf(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(results_dir)
            .unwrap_or(entry.path())
            .to_path_buf();
        if !is_safe_member_path(&relative) {
            warn!("skipping unsafe archive member path '{}'", relative.display());
            continue;
        }
        relative_paths.push(relative);
    }
    relative_paths.sort_by_key(to_posix_member_name);

    for relative in relative_paths {
        let member_name = to_posix_member_name(&relative);
        let full_path = results_dir.join(&relative);
        builder
            .append_path_with_name(&full_path, &member_name)
            .context(error::AddMemberSnafu {
                path: member_name.clone(),
            })?;
    }

    let gz = builder.into_inner().context(error::FinishSnafu)?;
    gz.finish().context(error::FinishSnafu)?;
    Ok(())
}
