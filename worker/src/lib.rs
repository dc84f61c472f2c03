//! The worker sidecar injected alongside every plugin container (SPEC_FULL.md §4.2/§4.7):
//! relays the plugin's local progress posts to the aggregator, waits for the plugin's readiness
//! file, then reads and submits its result artifact. Grounded on `test-agent`'s `TestAgent<C, R>`
//! poll/timeout harness (`agent/test-agent/src/agent.rs`), generalized from "run and report a
//! test" to "relay progress and forward a result artifact".

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod readiness;
pub mod relay;

pub use client::AggregatorClient;
pub use config::WorkerConfig;
pub use error::{Error, Result};

use log::info;
use std::sync::Arc;

/// Runs the sidecar to completion: starts the progress relay, waits for the plugin to finish,
/// submits its result artifact. Returns once the artifact has been accepted by the aggregator.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let client = Arc::new(AggregatorClient::new(&config)?);
    let relay_handle = relay::spawn(&config, Arc::clone(&client));

    info!("waiting for plugin readiness file at '{}'", config.done_file_path().display());
    readiness::wait_for_done(&config).await?;

    info!("locating result artifact for plugin '{}'", config.plugin_name);
    let artifact = artifact::locate(&config)?;

    info!(
        "submitting result artifact '{}' ({} bytes)",
        artifact.filename,
        artifact.body.len()
    );
    client
        .submit_result(artifact.body, &artifact.filename, &artifact.content_type)
        .await?;

    relay_handle.abort();
    Ok(())
}
