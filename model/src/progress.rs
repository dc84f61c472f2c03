use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A best-effort progress report from a worker sidecar. Does not change a slot's status; only
/// the latest update is retained (§4.3 "progress does not change the slot's status").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct ProgressUpdate {
    pub plugin: String,
    pub node: Option<String>,
    pub msg: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failures: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_body() {
        let body = r#"{"plugin":"e2e","msg":"running 4/10"}"#;
        let update: ProgressUpdate = serde_json::from_str(body).unwrap();
        assert_eq!(update.plugin, "e2e");
        assert_eq!(update.total, 0);
        assert!(update.failures.is_empty());
    }
}
