//! Shared state for the dashboard view and notification history

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::notifier::NotificationRecord;
use crate::reducer::DashboardView;

/// Shared state accessible by engine and dashboard
#[derive(Debug)]
pub struct SharedState {
    pub view: DashboardView,
    pub history: VecDeque<NotificationRecord>,
    pub history_max_size: usize,
    pub snapshots_processed: u64,
    pub last_snapshot_epoch_ms: Option<u64>,
    pub started_at: Instant,
}

impl SharedState {
    pub fn new(history_max_size: usize) -> Self {
        Self {
            view: DashboardView::empty(),
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
            snapshots_processed: 0,
            last_snapshot_epoch_ms: None,
            started_at: Instant::now(),
        }
    }

    /// Replace the current view with the result of a new snapshot
    pub fn apply_view(&mut self, view: DashboardView, now_ms: u64) {
        self.view = view;
        self.snapshots_processed += 1;
        self.last_snapshot_epoch_ms = Some(now_ms);
    }

    /// Show the empty view until the next snapshot arrives
    pub fn reset_view(&mut self) {
        self.view = DashboardView::empty();
    }

    /// Add a notification to history
    pub fn add_notification(&mut self, record: NotificationRecord) {
        if self.history_max_size == 0 {
            return;
        }
        if self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(history_max_size)))
}
