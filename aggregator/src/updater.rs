use crate::error::{self, Result};
use crate::owner::{self, OwnerMsg, SubmitOutcome};
use model::progress::ProgressUpdate;
use model::slot::{ExpectedResult, SlotKey};
use snafu::OptionExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// The interface the HTTP layer and the run controller use to reach the slot owner. Neither side
/// holds the slot table directly — this is the message-passing decomposition called for in
/// SPEC_FULL.md §9 in place of the teacher's cyclic controller/server pointers.
#[derive(Clone)]
pub struct SlotUpdater {
    tx: mpsc::Sender<OwnerMsg>,
    terminal_rx: watch::Receiver<bool>,
}

impl SlotUpdater {
    /// Spawns the owner task over the given initial slot table and returns a handle to it. The
    /// progress channel is bounded and lossy by design; `submit`/`Timeout`/`Liveness` share the
    /// same channel and are never dropped because the channel is only ever filled by the
    /// (rate-limited) watchdogs and the (serialized, one-per-slot) terminal submissions.
    pub fn spawn(initial: HashMap<SlotKey, ExpectedResult>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let (terminal_tx, terminal_rx) = watch::channel(initial.values().all(|s| s.status.is_terminal()));
        tokio::spawn(owner::run(initial, rx, terminal_tx));
        Self { tx, terminal_rx }
    }

    /// A read-only handle usable where only HTTP 404/409 decisions or status snapshots are
    /// needed.
    pub fn reader(&self) -> SlotReader {
        SlotReader {
            tx: self.tx.clone(),
        }
    }

    pub async fn submit(
        &self,
        key: SlotKey,
        client_fingerprint: String,
        filename: String,
        mime_type: Option<String>,
    ) -> Result<SubmitOutcome> {
        let (respond, recv) = oneshot::channel();
        self.tx
            .send(OwnerMsg::Submit {
                key,
                client_fingerprint,
                filename,
                mime_type,
                respond,
            })
            .await
            .ok()
            .context(error::OwnerGoneSnafu)?;
        recv.await.ok().context(error::OwnerGoneSnafu)
    }

    /// Best-effort: a full channel silently drops the update rather than blocking the caller
    /// (SPEC_FULL.md §5).
    pub fn progress(&self, key: SlotKey, update: ProgressUpdate) {
        let _ = self.tx.try_send(OwnerMsg::Progress { key, update });
    }

    pub async fn timeout(&self, key: SlotKey) -> Result<()> {
        self.tx
            .send(OwnerMsg::Timeout { key })
            .await
            .ok()
            .context(error::OwnerGoneSnafu)
    }

    pub async fn liveness_failed(&self, key: SlotKey, reason: String) -> Result<()> {
        self.tx
            .send(OwnerMsg::Liveness { key, reason })
            .await
            .ok()
            .context(error::OwnerGoneSnafu)
    }

    pub async fn snapshot(&self) -> Result<Vec<ExpectedResult>> {
        self.reader().snapshot().await
    }

    /// Resolves once every slot has reached a terminal state. This is the happens-before edge
    /// from every slot transition to the post-processor that SPEC_FULL.md §5 requires.
    pub async fn wait_all_terminal(&self) {
        let mut rx = self.terminal_rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// A read-only view of the slot table, handed to HTTP handlers that only need to decide 404 vs
/// 409 vs proceed, without the ability to mutate anything directly.
#[derive(Clone)]
pub struct SlotReader {
    tx: mpsc::Sender<OwnerMsg>,
}

impl SlotReader {
    pub async fn snapshot(&self) -> Result<Vec<ExpectedResult>> {
        let (respond, recv) = oneshot::channel();
        self.tx
            .send(OwnerMsg::Query { respond })
            .await
            .ok()
            .context(error::OwnerGoneSnafu)?;
        recv.await.ok().context(error::OwnerGoneSnafu)
    }
}
