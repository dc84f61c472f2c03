use crate::config::WorkerConfig;
use crate::error::{self, Result};
use model::constants::routes;
use model::progress::ProgressUpdate;
use snafu::{ensure, ResultExt};

/// The worker's half of SPEC_FULL.md §4.3's wire protocol: an mTLS HTTPS client authenticated
/// with the client identity the launcher issued this plugin, submitting progress and the final
/// result artifact to the aggregation server.
pub struct AggregatorClient {
    http: reqwest::Client,
    base_url: String,
    result_type: String,
    node_name: Option<String>,
}

impl AggregatorClient {
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let mut identity_pem = config.client_cert_pem.clone();
        identity_pem.push('\n');
        identity_pem.push_str(&config.client_key_pem);
        let identity = reqwest::Identity::from_pem(identity_pem.as_bytes()).context(error::BuildIdentitySnafu)?;
        let ca_cert =
            reqwest::Certificate::from_pem(config.ca_cert_pem.as_bytes()).context(error::BuildIdentitySnafu)?;

        let http = reqwest::Client::builder()
            .identity(identity)
            .add_root_certificate(ca_cert)
            .build()
            .context(error::BuildClientSnafu)?;

        Ok(Self {
            http,
            base_url: config.aggregator_url.clone(),
            result_type: config.result_type.clone(),
            node_name: config.node_name.clone(),
        })
    }

    /// Posts a best-effort progress update. Callers should log rather than fail the run on error
    /// (SPEC_FULL.md §4.3 "progress is best-effort").
    pub async fn post_progress(&self, update: &ProgressUpdate) -> Result<()> {
        let path = match &self.node_name {
            Some(node) => routes::progress_by_node(node, &self.result_type),
            None => routes::progress_global(&self.result_type),
        };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(update)
            .send()
            .await
            .context(error::SubmitSnafu { what: "progress" })?;
        // Progress is best-effort on the server side too; a non-2xx response is logged by the
        // caller, not escalated into a hard error here.
        let _ = response.status();
        Ok(())
    }

    /// Streams the final result artifact to the aggregator. `body` is the full artifact bytes
    /// (a tarball or the raw submitted file), `filename` becomes the `Content-Disposition`
    /// filename, `content_type` the body's MIME type.
    pub async fn submit_result(&self, body: Vec<u8>, filename: &str, content_type: &str) -> Result<()> {
        let path = match &self.node_name {
            Some(node) => routes::results_by_node(node, &self.result_type),
            None => routes::results_global(&self.result_type),
        };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            )
            .body(body)
            .send()
            .await
            .context(error::SubmitSnafu { what: "result" })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            error::SubmitRejectedSnafu {
                what: "result".to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            }
        );
        Ok(())
    }
}
