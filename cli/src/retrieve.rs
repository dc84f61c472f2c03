use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed retry policy for the "not ready" gap (SPEC_FULL.md §9, resolved): bounded attempts, fixed
/// backoff, then give up with an operational error rather than retrying forever.
const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Fetch the archive produced by the most recent run.
#[derive(Debug, Parser)]
pub(crate) struct Retrieve {
    /// Directory to write the archive into.
    #[clap(default_value = ".")]
    dir: PathBuf,

    /// Path a `run` invocation wrote its archive to.
    #[clap(long, default_value = "results.tar.gz")]
    from: PathBuf,
}

impl Retrieve {
    pub(crate) async fn run(self) -> Result<i32> {
        let mut attempt = 0;
        loop {
            if self.from.is_file() {
                break;
            }
            attempt += 1;
            if attempt > MAX_ATTEMPTS {
                bail!(
                    "archive '{}' is not ready after {} attempts (run may not have finished post-processing)",
                    self.from.display(),
                    MAX_ATTEMPTS
                );
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("unable to create destination directory '{}'", self.dir.display()))?;
        let filename = self
            .from
            .file_name()
            .context("archive path has no filename component")?;
        let destination = self.dir.join(filename);
        std::fs::copy(&self.from, &destination).with_context(|| {
            format!(
                "unable to copy '{}' to '{}'",
                self.from.display(),
                destination.display()
            )
        })?;
        println!("{}", destination.display());
        Ok(0)
    }
}
