use crate::client::AggregatorClient;
use crate::config::WorkerConfig;
use crate::error::{self, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use log::warn;
use model::progress::ProgressUpdate;
use serde::Deserialize;
use snafu::ResultExt;
use std::net::SocketAddr;
use std::sync::Arc;

/// The progress body a plugin container posts to the sidecar's local listener. Plugins know
/// nothing about which plugin or node they are (that's the sidecar's job to fill in), so this is
/// deliberately a subset of `ProgressUpdate`.
#[derive(Deserialize)]
struct LocalProgress {
    msg: String,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    failures: Vec<String>,
}

#[derive(Clone)]
struct RelayState {
    client: Arc<AggregatorClient>,
    plugin_name: String,
    node_name: Option<String>,
}

/// Starts the sidecar's local progress listener (SPEC_FULL.md §4.2 "a progress HTTP listener on
/// `progress_port`"): the plugin container posts its own progress here over plain HTTP on
/// localhost, and the sidecar relays each update to the aggregator over its mTLS connection.
/// Runs until the process exits; the caller does not need to await it to completion.
pub fn spawn(config: &WorkerConfig, client: Arc<AggregatorClient>) -> tokio::task::JoinHandle<Result<()>> {
    let state = RelayState {
        client,
        plugin_name: config.plugin_name.clone(),
        node_name: config.node_name.clone(),
    };
    let app = Router::new().route("/progress", post(handle_progress)).with_state(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.progress_port));

    tokio::spawn(async move { run(addr, app).await })
}

async fn run(addr: SocketAddr, app: Router) -> Result<()> {
    axum::Server::try_bind(&addr)
        .context(error::BindRelaySnafu { addr })?
        .serve(app.into_make_service())
        .await
        .context(error::RelayServerSnafu)
}

async fn handle_progress(State(state): State<RelayState>, Json(body): Json<LocalProgress>) -> StatusCode {
    let update = ProgressUpdate {
        plugin: state.plugin_name.clone(),
        node: state.node_name.clone(),
        msg: body.msg,
        total: body.total,
        completed: body.completed,
        failures: body.failures,
        timestamp: Utc::now(),
    };
    if let Err(e) = state.client.post_progress(&update).await {
        warn!("unable to relay progress to aggregator: {}", e);
    }
    StatusCode::OK
}
