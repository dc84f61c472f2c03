use crate::run::SlotStatusRow;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Print a snapshot of every slot's state from the most recent run.
///
/// Reads the `meta/run-state.json` file a `run` invocation leaves behind in the results
/// directory, since intermediate run state is not persisted anywhere else between invocations
/// (SPEC_FULL.md §6 "Persisted state").
#[derive(Debug, Parser)]
pub(crate) struct Status {
    /// Results directory a previous `run` wrote to.
    #[clap(long, default_value = "/tmp/sonobuoy")]
    results_dir: PathBuf,

    /// Output the results in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Status {
    pub(crate) fn run(self) -> Result<i32> {
        let path = self.results_dir.join("meta").join("run-state.json");
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("no run state found at '{}'; has `run` completed?", path.display()))?;
        let rows: Vec<SlotStatusRow> =
            serde_json::from_str(&raw).with_context(|| format!("unable to parse '{}'", path.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            println!("{:<24}{:<16}{:<12}{:<12}", "PLUGIN", "NODE", "STATUS", "RESULT");
            for row in &rows {
                let result_status = row
                    .result_status
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24}{:<16}{:<12}{:<12}",
                    row.plugin,
                    row.node,
                    format!("{:?}", row.status),
                    result_status
                );
            }
        }

        let any_failed = rows.iter().any(|row| match &row.result_status {
            Some(model::slot::ResultStatus::Failed) => true,
            Some(model::slot::ResultStatus::Other(s)) if s == "timeout" => true,
            _ => false,
        });
        Ok(if any_failed { 1 } else { 0 })
    }
}
