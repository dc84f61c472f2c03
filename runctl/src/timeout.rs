use aggregator::SlotUpdater;
use log::info;
use model::slot::SlotKey;
use std::time::Duration;

/// Fires once after `timeout` and marks every still-open slot in `keys` as `timeout`
/// (SPEC_FULL.md §4.4, §5 "timeout watcher"). The owner task ignores the transition for any slot
/// that already reached a terminal state, so a submission that lands first always wins
/// (§8 "timeout sandwich").
pub async fn watch(updater: SlotUpdater, timeout: Duration, keys: Vec<SlotKey>) {
    tokio::select! {
        _ = tokio::time::sleep(timeout) => {}
        _ = updater.wait_all_terminal() => return,
    }
    info!("plugin timeout of {:?} reached, closing out remaining slots", timeout);
    for key in keys {
        let _ = updater.timeout(key).await;
    }
}
