use crate::error::{self, Result};
use model::slot::ResultStatus;
use model::ResultItem;
use snafu::ResultExt;
use std::path::Path;

/// Walks `dir` and creates one leaf per file, `status = unknown`, metadata recording the file's
/// path relative to `dir` (SPEC_FULL.md §4.5). Traversal is lexicographic so the result is
/// deterministic (§8).
pub fn read_dir(dir: &Path) -> Result<Vec<ResultItem>> {
    let mut entries: Vec<walkdir::DirEntry> = walkdir::WalkDir::new(dir)
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            let io_err = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed"));
            error::Error::ReadDir {
                path: dir.to_path_buf(),
                source: io_err,
            }
        })?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by(|a, b| a.path().cmp(b.path()));

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        let mut item = ResultItem::leaf(relative.clone(), ResultStatus::Unknown);
        item.metadata.insert("file".to_string(), relative);
        item.metadata.insert("type".to_string(), "file".to_string());
        items.push(item);
    }
    Ok(items)
}

/// Reads a single submitted file (not a directory) as one raw leaf.
pub fn read_single_file(path: &Path) -> Result<ResultItem> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut item = ResultItem::leaf(name.clone(), ResultStatus::Unknown);
    item.metadata.insert("file".to_string(), name);
    item.metadata.insert("type".to_string(), "file".to_string());
    // Touch the file to surface a read error consistently with the directory-walk path, even
    // though raw ingestion does not need the contents.
    std::fs::metadata(path).context(error::ReadFileSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(item)
}
