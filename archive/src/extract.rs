use crate::error::{self, Result};
use crate::path_safety::is_safe_member_path;
use flate2::read::GzDecoder;
use snafu::{ensure, ResultExt};
use std::io::Read;
use std::path::Path;

/// Untars a gzip tar stream into `dest_dir`, applying the same path-safety rule the assembler
/// enforces when writing (SPEC_FULL.md §4.6, §8 "path safety"): any member whose path contains a
/// `..` component or is absolute is refused and the whole extraction aborts, rather than silently
/// skipping one bad member and leaving the caller to assume a complete archive.
pub fn extract_gzip_tar<R: Read>(input: R, dest_dir: &Path) -> Result<()> {
    let decoder = GzDecoder::new(input);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries().context(error::ReadEntrySnafu)? {
        let mut entry = entry.context(error::ReadEntrySnafu)?;
        let path = entry.path().context(error::ReadEntrySnafu)?.into_owned();
        ensure!(
            is_safe_member_path(&path),
            error::UnsafeMemberPathSnafu {
                path: path.display().to_string(),
            }
        );
        let target = dest_dir.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).context(error::ExtractSnafu {
                path: path.display().to_string(),
            })?;
        }
        entry.unpack(&target).context(error::ExtractSnafu {
            path: path.display().to_string(),
        })?;
    }
    Ok(())
}

/// Untars a plain (non-gzip) tar stream, for submissions the worker sidecar sends uncompressed.
pub fn extract_tar<R: Read>(input: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(input);
    for entry in archive.entries().context(error::ReadEntrySnafu)? {
        let mut entry = entry.context(error::ReadEntrySnafu)?;
        let path = entry.path().context(error::ReadEntrySnafu)?.into_owned();
        ensure!(
            is_safe_member_path(&path),
            error::UnsafeMemberPathSnafu {
                path: path.display().to_string(),
            }
        );
        let target = dest_dir.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).context(error::ExtractSnafu {
                path: path.display().to_string(),
            })?;
        }
        entry.unpack(&target).context(error::ExtractSnafu {
            path: path.display().to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_tar_with_member(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents).unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn rejects_path_traversal_member() {
        let bytes = build_tar_with_member("../evil.txt", b"pwned");
        let dir = tempfile::tempdir().unwrap();
        let result = extract_tar(bytes.as_slice(), dir.path());
        assert!(matches!(result.unwrap_err(), crate::error::Error::UnsafeMemberPath { .. }));
    }

    #[test]
    fn extracts_well_formed_member() {
        let bytes = build_tar_with_member("plugins/e2e/results/global/junit.xml", b"<ok/>");
        let dir = tempfile::tempdir().unwrap();
        extract_tar(bytes.as_slice(), dir.path()).unwrap();
        let mut contents = String::new();
        std::fs::File::open(dir.path().join("plugins/e2e/results/global/junit.xml"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "<ok/>");
    }
}
