use crate::error::Result;
use crate::{junit, manual, raw};
use model::ResultItem;
use model::Driver;
use model::ResultFormat;
use std::path::Path;

/// One plugin's submitted artifact for a single node, already on disk and (if it was a tarball)
/// extracted.
pub struct Submission<'a> {
    /// Directory containing the extracted artifact, or the single submitted file's parent.
    pub dir: &'a Path,
    /// The submitted file's name, if the submission was a single file rather than an archive.
    pub filename: Option<&'a str>,
}

/// The capability every result-format reader implements: turn a node's submission into the
/// top-level items that belong directly under that node in the result tree
/// (SPEC_FULL.md §9 "tagged variant with a Reader capability set", registered here by
/// `ResultFormat` rather than a string tag since the format is already a typed enum).
pub trait Reader {
    fn read(&self, submission: &Submission) -> Result<Vec<ResultItem>>;
}

struct JunitReader;
struct ManualReader;
struct RawReader;

impl Reader for JunitReader {
    fn read(&self, submission: &Submission) -> Result<Vec<ResultItem>> {
        let files = junit_files(submission)?;
        files.iter().map(|f| junit::read_file(f)).collect()
    }
}

impl Reader for ManualReader {
    fn read(&self, submission: &Submission) -> Result<Vec<ResultItem>> {
        let path = match submission.filename {
            Some(name) => submission.dir.join(name),
            None => single_file_in(submission.dir)?,
        };
        Ok(vec![manual::read_file(&path)?])
    }
}

impl Reader for RawReader {
    fn read(&self, submission: &Submission) -> Result<Vec<ResultItem>> {
        match submission.filename {
            Some(name) => Ok(vec![raw::read_single_file(&submission.dir.join(name))?]),
            None => raw::read_dir(submission.dir),
        }
    }
}

fn junit_files(submission: &Submission) -> Result<Vec<std::path::PathBuf>> {
    if let Some(name) = submission.filename {
        return Ok(vec![submission.dir.join(name)]);
    }
    let mut files: Vec<std::path::PathBuf> = walkdir::WalkDir::new(submission.dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "xml").unwrap_or(false))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

fn single_file_in(dir: &Path) -> Result<std::path::PathBuf> {
    let mut files: Vec<std::path::PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files.into_iter().next().unwrap_or_else(|| dir.to_path_buf()))
}

/// Returns the reader registered for `format`. `driver` is accepted for symmetry with the rest
/// of the crate's call sites even though no format currently varies its reader by driver.
pub fn reader_for(format: ResultFormat, _driver: Driver) -> Box<dyn Reader> {
    match format {
        ResultFormat::Junit => Box::new(JunitReader),
        ResultFormat::Manual => Box::new(ManualReader),
        ResultFormat::Raw => Box::new(RawReader),
    }
}
