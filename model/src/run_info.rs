use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata about one Sonobuoy run, written to `meta/info.json` in the archive (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub uuid: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub loaded_plugins: Vec<String>,
    pub server_version: String,
    pub client_version: String,
}

impl RunInfo {
    pub fn start(loaded_plugins: Vec<String>, server_version: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: None,
            loaded_plugins,
            server_version: server_version.into(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}
