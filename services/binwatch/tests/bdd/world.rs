//! BDD test world for binwatch service

use std::sync::Arc;

use binwatch::notifier::{Notification, Notifier};
use binwatch::record::BinCollection;
use binwatch::reducer::{Reduction, TransitionMemory};
use binwatch::state::StateHandle;
use binwatch::store::MemoryStore;
use cucumber::World;
use tokio::sync::RwLock;

#[derive(Debug, Default, World)]
pub struct BinwatchWorld {
    // Reducer testing
    pub snapshot: BinCollection,
    pub memory: TransitionMemory,
    pub last_reduction: Option<Reduction>,

    // Dashboard testing
    pub store: Option<Arc<MemoryStore>>,
    pub state: Option<StateHandle>,
    pub client_config: Option<String>,
    pub recorder: Option<Arc<RecordingNotifier>>,
    pub response_status: Option<u16>,
    pub response_body: Option<String>,
}

/// A test notifier that records notifications
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub records: RwLock<Vec<Notification>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> binwatch::Result<()> {
        self.records.write().await.push(notification.clone());
        Ok(())
    }
}
