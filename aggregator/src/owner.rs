use model::progress::ProgressUpdate;
use model::slot::{ExpectedResult, SlotKey, SlotStatus};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot, watch};

/// The result of attempting to commit a terminal submission to a slot. Mirrors the HTTP status
/// codes the aggregation server returns (SPEC_FULL.md §4.3): `Accepted` -> 200, `Forbidden` ->
/// 403, `NotFound` -> 404, `AlreadyTerminal` -> 409.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Forbidden,
    NotFound,
    AlreadyTerminal,
}

#[derive(Debug)]
pub(crate) enum OwnerMsg {
    /// A terminal result submission. Always delivered, even if it must block the HTTP handler
    /// (SPEC_FULL.md §5: "result submissions always reach the owner").
    Submit {
        key: SlotKey,
        client_fingerprint: String,
        filename: String,
        mime_type: Option<String>,
        respond: oneshot::Sender<SubmitOutcome>,
    },
    /// A best-effort progress update; the caller does not wait for a response and the sender
    /// side uses `try_send` so a full channel simply drops the update.
    Progress { key: SlotKey, update: ProgressUpdate },
    /// The timeout watcher committing a `timeout` transition.
    Timeout { key: SlotKey },
    /// The liveness watcher committing a `failed` transition after observing pod termination.
    Liveness { key: SlotKey, reason: String },
    Query {
        respond: oneshot::Sender<Vec<ExpectedResult>>,
    },
}

/// Runs the single slot-owner task: every mutation to the slot table passes through this loop,
/// so "check terminal -> update -> acknowledge" is always atomic (SPEC_FULL.md §4.3, §5). Owns
/// the `HashMap` exclusively; nothing else ever touches it directly.
pub(crate) async fn run(
    mut slots: HashMap<SlotKey, ExpectedResult>,
    mut rx: mpsc::Receiver<OwnerMsg>,
    terminal_tx: watch::Sender<bool>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            OwnerMsg::Submit {
                key,
                client_fingerprint,
                filename,
                mime_type,
                respond,
            } => {
                let outcome = handle_submit(&mut slots, &key, &client_fingerprint, filename, mime_type);
                let _ = respond.send(outcome);
            }
            OwnerMsg::Progress { key, update } => {
                if let Some(slot) = slots.get_mut(&key) {
                    slot.progress = Some(update);
                }
            }
            OwnerMsg::Timeout { key } => {
                if let Some(slot) = slots.get_mut(&key) {
                    if !slot.status.is_terminal() {
                        slot.status = SlotStatus::Timeout;
                        slot.result_status = Some(model::slot::ResultStatus::Other("timeout".to_string()));
                    }
                }
            }
            OwnerMsg::Liveness { key, reason } => {
                if let Some(slot) = slots.get_mut(&key) {
                    if !slot.status.is_terminal() {
                        slot.status = SlotStatus::Failed;
                        slot.error_message = Some(reason);
                    }
                }
            }
            OwnerMsg::Query { respond } => {
                let _ = respond.send(slots.values().cloned().collect());
            }
        }
        let _ = terminal_tx.send(slots.values().all(|s| s.status.is_terminal()));
    }
}

fn handle_submit(
    slots: &mut HashMap<SlotKey, ExpectedResult>,
    key: &SlotKey,
    client_fingerprint: &str,
    filename: String,
    mime_type: Option<String>,
) -> SubmitOutcome {
    let slot = match slots.get_mut(key) {
        Some(slot) => slot,
        None => return SubmitOutcome::NotFound,
    };
    match &slot.client_cert_fingerprint {
        Some(expected) if expected == client_fingerprint => {}
        _ => return SubmitOutcome::Forbidden,
    }
    if slot.status.is_terminal() {
        return SubmitOutcome::AlreadyTerminal;
    }
    slot.status = SlotStatus::Complete;
    slot.filename = Some(filename);
    slot.mime_type = mime_type;
    SubmitOutcome::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::slot::NodeKey;

    fn slot(fingerprint: &str) -> ExpectedResult {
        let mut e = ExpectedResult::new(SlotKey::global("e2e"));
        e.client_cert_fingerprint = Some(fingerprint.to_string());
        e
    }

    #[test]
    fn unknown_slot_is_not_found() {
        let mut slots = HashMap::new();
        let outcome = handle_submit(&mut slots, &SlotKey::global("missing"), "fp", "f".into(), None);
        assert_eq!(outcome, SubmitOutcome::NotFound);
    }

    #[test]
    fn wrong_fingerprint_is_forbidden() {
        let mut slots = HashMap::new();
        slots.insert(SlotKey::global("e2e"), slot("correct-fp"));
        let outcome = handle_submit(&mut slots, &SlotKey::global("e2e"), "wrong-fp", "f".into(), None);
        assert_eq!(outcome, SubmitOutcome::Forbidden);
    }

    #[test]
    fn first_submission_is_accepted_and_terminal() {
        let mut slots = HashMap::new();
        slots.insert(SlotKey::global("e2e"), slot("fp"));
        let outcome = handle_submit(&mut slots, &SlotKey::global("e2e"), "fp", "f.tar.gz".into(), None);
        assert_eq!(outcome, SubmitOutcome::Accepted);
        assert_eq!(slots[&SlotKey::global("e2e")].status, SlotStatus::Complete);
    }

    #[test]
    fn second_submission_is_conflict() {
        let mut slots = HashMap::new();
        slots.insert(SlotKey::global("e2e"), slot("fp"));
        handle_submit(&mut slots, &SlotKey::global("e2e"), "fp", "f.tar.gz".into(), None);
        let outcome = handle_submit(&mut slots, &SlotKey::global("e2e"), "fp", "f2.tar.gz".into(), None);
        assert_eq!(outcome, SubmitOutcome::AlreadyTerminal);
    }

    #[test]
    fn daemonset_node_slots_are_independent() {
        let mut slots = HashMap::new();
        slots.insert(
            SlotKey::new("e2e", NodeKey::Node("node-1".to_string())),
            slot("fp"),
        );
        slots.insert(
            SlotKey::new("e2e", NodeKey::Node("node-2".to_string())),
            slot("fp"),
        );
        handle_submit(
            &mut slots,
            &SlotKey::new("e2e", NodeKey::Node("node-1".to_string())),
            "fp",
            "f".into(),
            None,
        );
        assert_eq!(
            slots[&SlotKey::new("e2e", NodeKey::Node("node-2".to_string()))].status,
            SlotStatus::Pending
        );
    }
}
