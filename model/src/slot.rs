use crate::constants::GLOBAL_NODE_KEY;
use crate::progress::ProgressUpdate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The node half of a slot key: `Global` for Job plugins, `Node(name)` for a DaemonSet plugin's
/// per-node result.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeKey {
    Global,
    Node(String),
}

impl NodeKey {
    /// The string used on the wire (URL path segment, archive directory name): `"global"` or the
    /// node name, matching §3's `node_key` definition.
    pub fn as_str(&self) -> &str {
        match self {
            NodeKey::Global => GLOBAL_NODE_KEY,
            NodeKey::Node(name) => name,
        }
    }

    pub fn from_path_segment(segment: &str) -> Self {
        if segment == GLOBAL_NODE_KEY {
            NodeKey::Global
        } else {
            NodeKey::Node(segment.to_string())
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one expected result: a plugin and the node (or "global") that produces it.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub plugin_name: String,
    pub node_key: NodeKey,
}

impl SlotKey {
    pub fn new(plugin_name: impl Into<String>, node_key: NodeKey) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            node_key,
        }
    }

    pub fn global(plugin_name: impl Into<String>) -> Self {
        Self::new(plugin_name, NodeKey::Global)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin_name, self.node_key)
    }
}

/// The lifecycle state of one expected result. Frozen once it reaches `Complete`, `Failed`, or
/// `Timeout`; the aggregation server and the timeout watcher are the only writers, and only one
/// of them ever commits the terminal transition (§8 "single-writer per slot").
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Timeout,
}

impl SlotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SlotStatus::Complete | SlotStatus::Failed | SlotStatus::Timeout
        )
    }
}

/// The pass/fail verdict for a completed result. Built-in variants always take precedence over
/// `Other` in CLI summaries (resolution of the open question in SPEC_FULL.md §9).
///
/// Serialized as a bare lowercase string rather than through derived enum tagging, since
/// `Other(String)` needs to round-trip as whatever custom word a plugin wrote rather than a
/// wrapped/tagged representation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResultStatus {
    Passed,
    Failed,
    Unknown,
    Other(String),
}

impl ResultStatus {
    /// `true` for the built-in variants; `false` for a plugin-supplied custom string.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, ResultStatus::Other(_))
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Passed => f.write_str("passed"),
            ResultStatus::Failed => f.write_str("failed"),
            ResultStatus::Unknown => f.write_str("unknown"),
            ResultStatus::Other(s) => f.write_str(s),
        }
    }
}

impl std::str::FromStr for ResultStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "passed" => ResultStatus::Passed,
            "failed" => ResultStatus::Failed,
            "unknown" => ResultStatus::Unknown,
            other => ResultStatus::Other(other.to_string()),
        })
    }
}

impl Serialize for ResultStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResultStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.parse() {
            Ok(status) => Ok(status),
            Err(infallible) => match infallible {},
        }
    }
}

/// One pre-allocated placeholder for a result the run controller expects to receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedResult {
    pub key: SlotKey,
    /// Mirrors `plugin_name` by default; kept distinct because a plugin could in principle
    /// report under an alternate result type.
    pub result_type: String,
    pub status: SlotStatus,
    pub result_status: Option<ResultStatus>,
    pub progress: Option<ProgressUpdate>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub error_message: Option<String>,
    /// SHA-256 fingerprint of the client certificate issued to this slot's worker, recorded at
    /// launch time and checked by the aggregation server on every submission (§4.2, §4.3).
    pub client_cert_fingerprint: Option<String>,
}

impl ExpectedResult {
    pub fn new(key: SlotKey) -> Self {
        let result_type = key.plugin_name.clone();
        Self {
            key,
            result_type,
            status: SlotStatus::Pending,
            result_status: None,
            progress: None,
            mime_type: None,
            filename: None,
            error_message: None,
            client_cert_fingerprint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_round_trips_through_path_segment() {
        assert_eq!(NodeKey::from_path_segment("global"), NodeKey::Global);
        assert_eq!(
            NodeKey::from_path_segment("node-1"),
            NodeKey::Node("node-1".to_string())
        );
        assert_eq!(NodeKey::Global.as_str(), "global");
        assert_eq!(NodeKey::Node("node-1".to_string()).as_str(), "node-1");
    }

    #[test]
    fn terminal_states() {
        assert!(SlotStatus::Complete.is_terminal());
        assert!(SlotStatus::Failed.is_terminal());
        assert!(SlotStatus::Timeout.is_terminal());
        assert!(!SlotStatus::Pending.is_terminal());
        assert!(!SlotStatus::Running.is_terminal());
    }

    #[test]
    fn result_status_custom_string_roundtrips() {
        let value: ResultStatus = serde_json::from_str("\"flaky\"").unwrap();
        assert_eq!(value, ResultStatus::Other("flaky".to_string()));
        assert!(!value.is_builtin());
    }

    #[test]
    fn new_expected_result_defaults_to_pending() {
        let e = ExpectedResult::new(SlotKey::global("e2e"));
        assert_eq!(e.status, SlotStatus::Pending);
        assert_eq!(e.result_type, "e2e");
    }
}
