//! Engine: subscribes to the store, reduces snapshots, and dispatches alerts

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::notifier::{Notification, NotificationRecord, Notifier};
use crate::record::BinCollection;
use crate::reducer::{self, AlertEffect, TransitionMemory};
use crate::state::StateHandle;
use crate::store::BinStore;

/// Consecutive subscription failures before the engine warns
const SUBSCRIBE_ERROR_WARN_THRESHOLD: u32 = 5;

/// The engine owns the transition memory and runs the snapshot pipeline
pub struct Engine {
    store: Arc<dyn BinStore>,
    notifiers: Vec<Arc<dyn Notifier>>,
    state: StateHandle,
    retry_interval: Duration,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        store: Arc<dyn BinStore>,
        notifiers: Vec<Arc<dyn Notifier>>,
        state: StateHandle,
        retry_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            notifiers,
            state,
            retry_interval,
            cancel,
        }
    }

    /// Follow the store until the cancellation token is triggered.
    ///
    /// Every snapshot the subscription delivers runs through the pipeline,
    /// one at a time and in order. A failed or ended subscription is opened
    /// again after the retry interval; transition memory carries over, so
    /// the replayed current state raises no repeat alerts.
    pub async fn run(&self) {
        let mut memory = TransitionMemory::new();
        let mut consecutive_errors: u32 = 0;

        loop {
            match self.store.subscribe().await {
                Ok(mut subscription) => loop {
                    let next = tokio::select! {
                        next = subscription.next() => next,
                        _ = self.cancel.cancelled() => {
                            tracing::debug!("Subscription loop cancelled");
                            return;
                        }
                    };

                    match next {
                        Some(Ok(snapshot)) => {
                            if consecutive_errors >= SUBSCRIBE_ERROR_WARN_THRESHOLD {
                                tracing::info!(
                                    "Store '{}' reachable again after {} failed attempts",
                                    self.store.type_name(),
                                    consecutive_errors
                                );
                            }
                            consecutive_errors = 0;

                            let (next, _pending) = process_snapshot(
                                &snapshot,
                                memory,
                                &self.notifiers,
                                &self.state,
                                current_epoch_ms(),
                            )
                            .await;
                            memory = next;
                        }
                        Some(Err(e)) => {
                            self.record_error(&mut consecutive_errors, &e);
                            break;
                        }
                        None => {
                            tracing::debug!(
                                "Subscription to '{}' ended",
                                self.store.type_name()
                            );
                            break;
                        }
                    }
                },
                Err(e) => self.record_error(&mut consecutive_errors, &e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {}
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Subscription loop cancelled");
                    return;
                }
            }
        }
    }

    fn record_error(&self, consecutive_errors: &mut u32, error: &crate::BinwatchError) {
        *consecutive_errors += 1;
        tracing::debug!(
            "Subscription to '{}' failed: {}",
            self.store.type_name(),
            error
        );
        if *consecutive_errors == SUBSCRIBE_ERROR_WARN_THRESHOLD {
            tracing::warn!(
                "Store '{}' has {} consecutive subscription errors: {}",
                self.store.type_name(),
                consecutive_errors,
                error
            );
        }
    }
}

/// Run one snapshot through the pipeline.
///
/// Publishes the reduced view, spawns alert deliveries, and returns the
/// updated memory with the handles of the spawned deliveries. Callers are
/// free to drop the handles; delivery never gates the next snapshot.
pub async fn process_snapshot(
    snapshot: &BinCollection,
    memory: TransitionMemory,
    notifiers: &[Arc<dyn Notifier>],
    state: &StateHandle,
    now_ms: u64,
) -> (TransitionMemory, Vec<JoinHandle<()>>) {
    let reduction = reducer::reduce(snapshot, memory);

    tracing::debug!(
        "Snapshot with {} bins: {} full, {} alerting, {} alerts queued",
        reduction.view.stats.total_bins,
        reduction.view.stats.full_bins,
        reduction.view.stats.alert_bins,
        reduction.effects.len()
    );

    state.write().await.apply_view(reduction.view, now_ms);

    let pending = dispatch_alerts(&reduction.effects, notifiers, state, now_ms);
    (reduction.memory, pending)
}

/// Spawn one delivery task per alert and notifier.
///
/// Failures are logged and recorded in history; nothing is retried.
pub fn dispatch_alerts(
    effects: &[AlertEffect],
    notifiers: &[Arc<dyn Notifier>],
    state: &StateHandle,
    now_ms: u64,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(effects.len() * notifiers.len());

    for effect in effects {
        if notifiers.is_empty() {
            tracing::debug!(
                "No notifiers configured for {} alert on bin '{}'",
                effect.kind,
                effect.bin_id
            );
            continue;
        }

        let notification = Notification::from(effect);
        for notifier in notifiers {
            let notifier = Arc::clone(notifier);
            let state = Arc::clone(state);
            let notification = notification.clone();

            handles.push(tokio::spawn(async move {
                deliver(notifier, notification, state, now_ms).await;
            }));
        }
    }

    handles
}

async fn deliver(
    notifier: Arc<dyn Notifier>,
    notification: Notification,
    state: StateHandle,
    now_ms: u64,
) {
    let result = notifier.notify(&notification).await;

    match &result {
        Ok(()) => tracing::info!(
            "Alert sent via '{}' for bin '{}' ({} at {}%)",
            notifier.type_name(),
            notification.bin_id,
            notification.kind,
            notification.fill_percentage
        ),
        Err(e) => tracing::warn!(
            "Alert via '{}' for bin '{}' failed: {}",
            notifier.type_name(),
            notification.bin_id,
            e
        ),
    }

    let record = NotificationRecord {
        bin_id: notification.bin_id,
        kind: notification.kind,
        fill_percentage: notification.fill_percentage,
        notifier_type: notifier.type_name().to_string(),
        success: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
        timestamp_epoch_ms: now_ms,
    };
    state.write().await.add_notification(record);
}

pub(crate) fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
