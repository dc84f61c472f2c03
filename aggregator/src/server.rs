use crate::error::{self, Result};
use crate::owner::SubmitOutcome;
use crate::updater::SlotUpdater;
use axum::extract::{BodyStream, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use log::{error, info, warn};
use model::progress::ProgressUpdate;
use model::slot::{NodeKey, SlotKey};
use serde::Serialize;
use snafu::ResultExt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_rustls::TlsAcceptor;

#[derive(Clone)]
struct AppState {
    updater: SlotUpdater,
    results_dir: PathBuf,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

/// Builds the aggregation server's routes (SPEC_FULL.md §4.3/§6). `PeerFingerprint` is injected
/// per-connection by `serve`, not by this router, since axum's own `Router` has no notion of the
/// raw TLS session.
pub fn router(updater: SlotUpdater, results_dir: PathBuf) -> Router {
    let state = AppState { updater, results_dir };
    Router::new()
        .route(
            &model::constants::routes::results_by_node(":node", ":result_type"),
            post(submit_result),
        )
        .route(
            &model::constants::routes::results_global(":result_type"),
            post(submit_result_global),
        )
        .route(
            &model::constants::routes::progress_by_node(":node", ":result_type"),
            post(post_progress),
        )
        .route(
            &model::constants::routes::progress_global(":result_type"),
            post(post_progress_global),
        )
        .with_state(state)
}

async fn submit_result(
    State(state): State<AppState>,
    Path((node, result_type)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Extension(fingerprint): axum::Extension<String>,
    body: BodyStream,
) -> Response {
    handle_submit(
        state,
        SlotKey::new(result_type.clone(), NodeKey::Node(node)),
        result_type,
        headers,
        fingerprint,
        body,
    )
    .await
}

async fn submit_result_global(
    State(state): State<AppState>,
    Path(result_type): Path<String>,
    headers: HeaderMap,
    axum::Extension(fingerprint): axum::Extension<String>,
    body: BodyStream,
) -> Response {
    handle_submit(
        state,
        SlotKey::global(result_type.clone()),
        result_type,
        headers,
        fingerprint,
        body,
    )
    .await
}

async fn handle_submit(
    state: AppState,
    key: SlotKey,
    result_type: String,
    headers: HeaderMap,
    fingerprint: String,
    mut body: BodyStream,
) -> Response {
    let filename = filename_from_headers(&headers).unwrap_or_else(|| format!("{}.tar.gz", result_type));
    let mime_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let staging_dir = state.results_dir.join(".staging");
    if let Err(e) = tokio::fs::create_dir_all(&staging_dir).await {
        error!("unable to create staging directory for '{}': {}", key, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "unable to stage results directory");
    }
    let staging_path = staging_dir.join(uuid::Uuid::new_v4().to_string());

    // Stream the body to a staging path, outside the archive layout entirely, before the slot
    // owner has had any say over whether this submission is even valid. A cancelled upload is
    // allowed to finish its in-flight write so a later accepted submission never observes a
    // truncated artifact (SPEC_FULL.md §5).
    let write_result: std::result::Result<(), crate::error::Error> = async {
        let mut file = tokio::fs::File::create(&staging_path)
            .await
            .context(error::WriteArtifactSnafu {
                slot: key.to_string(),
            })?;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("error reading submission body for '{}': {}", key, e);
                    return Err(crate::error::Error::WriteArtifact {
                        slot: key.to_string(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                    });
                }
            };
            file.write_all(&chunk).await.context(error::WriteArtifactSnafu {
                slot: key.to_string(),
            })?;
        }
        file.flush().await.context(error::WriteArtifactSnafu {
            slot: key.to_string(),
        })?;
        Ok(())
    }
    .await;

    if let Err(e) = write_result {
        error!("protocol error receiving submission for '{}': {}", key, e);
        let _ = tokio::fs::remove_file(&staging_path).await;
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    // The owner is the only place auth and terminal state are decided (SPEC_FULL.md §8
    // "single-writer per slot"). Nothing above this point is allowed to touch the real results
    // tree, so a rejected or duplicate submission never creates or overwrites a slot's archive
    // entry and the "never both results and an error file" property in §8 holds even for a
    // late post-timeout POST.
    match state
        .updater
        .submit(key.clone(), fingerprint, filename.clone(), mime_type)
        .await
    {
        Ok(SubmitOutcome::Accepted) => match commit_staged_artifact(&state, &key, &filename, &staging_path).await {
            Ok(()) => {
                info!("accepted result submission for '{}'", key);
                StatusCode::OK.into_response()
            }
            Err(e) => {
                error!("unable to commit accepted submission for '{}': {}", key, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "unable to commit submitted artifact")
            }
        },
        Ok(SubmitOutcome::Forbidden) => {
            warn!("rejected submission for '{}': certificate mismatch", key);
            let _ = tokio::fs::remove_file(&staging_path).await;
            error_response(StatusCode::FORBIDDEN, "client certificate does not match this slot")
        }
        Ok(SubmitOutcome::NotFound) => {
            let _ = tokio::fs::remove_file(&staging_path).await;
            error_response(StatusCode::NOT_FOUND, format!("no such slot '{}'", key))
        }
        Ok(SubmitOutcome::AlreadyTerminal) => {
            let _ = tokio::fs::remove_file(&staging_path).await;
            error_response(StatusCode::CONFLICT, format!("slot '{}' is already terminal", key))
        }
        Err(e) => {
            error!("slot owner unreachable handling submission for '{}': {}", key, e);
            let _ = tokio::fs::remove_file(&staging_path).await;
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal aggregator error")
        }
    }
}

/// Moves a staged artifact into its canonical archive location. Only ever called after the owner
/// has already committed the slot's terminal transition to `Complete`, so the real results tree
/// gains a file only for a submission that actually won the single-writer race.
async fn commit_staged_artifact(
    state: &AppState,
    key: &SlotKey,
    filename: &str,
    staging_path: &std::path::Path,
) -> std::result::Result<(), crate::error::Error> {
    let dest_dir = state
        .results_dir
        .join("plugins")
        .join(&key.plugin_name)
        .join("results")
        .join(key.node_key.as_str());
    tokio::fs::create_dir_all(&dest_dir)
        .await
        .context(error::WriteArtifactSnafu {
            slot: key.to_string(),
        })?;
    let dest_path = dest_dir.join(filename);
    tokio::fs::rename(staging_path, &dest_path)
        .await
        .context(error::WriteArtifactSnafu {
            slot: key.to_string(),
        })
}

async fn post_progress(
    State(state): State<AppState>,
    Path((node, result_type)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> Response {
    handle_progress(state, SlotKey::new(result_type, NodeKey::Node(node)), body)
}

async fn post_progress_global(
    State(state): State<AppState>,
    Path(result_type): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    handle_progress(state, SlotKey::global(result_type), body)
}

/// Progress is best-effort: a malformed body is logged and answered with 400, but never touches
/// slot state (SPEC_FULL.md §4.3).
fn handle_progress(state: AppState, key: SlotKey, body: axum::body::Bytes) -> Response {
    let update: ProgressUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("malformed progress update for '{}': {}", key, e);
            return error_response(StatusCode::BAD_REQUEST, "malformed progress update");
        }
    };
    state.updater.progress(key, update);
    StatusCode::OK.into_response()
}

fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(axum::http::header::CONTENT_DISPOSITION)?.to_str().ok()?;
    raw.split(';')
        .map(|part| part.trim())
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
}

/// Accepts TLS connections on `addr`, extracts each peer's client certificate fingerprint during
/// the handshake, and serves `app` over the resulting connection. This is the only place the raw
/// `rustls::ServerConnection` is visible; everything above operates on the fingerprint string
/// injected as an extension.
pub async fn serve(
    addr: SocketAddr,
    tls_config: Arc<rustls::ServerConfig>,
    app: Router,
    ready: Option<tokio::sync::oneshot::Sender<()>>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(error::BindSnafu {
            addr: addr.to_string(),
        })?;
    let acceptor = TlsAcceptor::from(tls_config);
    info!("aggregation server listening on {}", addr);
    if let Some(ready) = ready {
        let _ = ready.send(());
    }

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("accept error: {}", e);
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let app = app.clone();
        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("TLS handshake failed from {}: {}", peer_addr, e);
                    return;
                }
            };
            let fingerprint = {
                let (_, session) = tls_stream.get_ref();
                session
                    .peer_certificates()
                    .and_then(crate::tls::peer_fingerprint)
            };
            let Some(fingerprint) = fingerprint else {
                warn!("connection from {} presented no client certificate", peer_addr);
                return;
            };
            let app = app.layer(axum::Extension(fingerprint));
            if let Err(e) = hyper::server::conn::Http::new()
                .serve_connection(tls_stream, app)
                .await
            {
                warn!("connection error from {}: {}", peer_addr, e);
            }
        });
    }
}
