use crate::error::{self, Result};
use model::ResultItem;
use snafu::ResultExt;
use std::path::Path;

/// Ingests a Sonobuoy-native manual result item YAML document verbatim (SPEC_FULL.md §4.5):
/// the author's own `status` is trusted as-is, including any custom string, rather than being
/// recomputed from children. This is the one format where a plugin can override the result
/// verdict the processor would otherwise derive.
pub fn read_file(path: &Path) -> Result<ResultItem> {
    let contents = std::fs::read_to_string(path).context(error::ReadFileSnafu {
        path: path.to_path_buf(),
    })?;
    let item: ResultItem = serde_yaml::from_str(&contents).context(error::ParseManualSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(item)
}
