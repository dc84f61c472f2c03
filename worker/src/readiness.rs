use crate::config::WorkerConfig;
use crate::error::{self, Result};
use log::debug;
use snafu::ResultExt;

/// Polls for the plugin container's readiness file on a fixed interval, grounded on
/// `test-agent`'s `run_status_loop` poll pattern (`agent/test-agent/src/agent.rs`). Returns once
/// the file appears; never times out on its own, since the run controller's timeout watcher
/// (SPEC_FULL.md §4.4) is the authority on how long a plugin is allowed to run.
pub async fn wait_for_done(config: &WorkerConfig) -> Result<()> {
    let path = config.done_file_path();
    loop {
        match std::fs::metadata(&path) {
            Ok(_) => {
                debug!("readiness file '{}' present", path.display());
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(error::Error::PollReadiness { path, source });
            }
        }
        tokio::time::sleep(config.done_poll_interval).await;
    }
}
