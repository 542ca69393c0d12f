//! Realtime store trait and in-memory implementation

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::record::{BinCollection, BinRecord};

/// Stream of full collection snapshots, one per change in the store
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next snapshot. `None` means the stream has ended.
    async fn next(&mut self) -> Option<crate::Result<BinCollection>>;
}

/// Access to the bin collection in the backing store
#[async_trait]
pub trait BinStore: Send + Sync + std::fmt::Debug {
    /// Get the store type name (e.g. "firebase")
    fn type_name(&self) -> &str;

    /// Read the full current collection
    async fn fetch(&self) -> crate::Result<BinCollection>;

    /// Write a single bin record, replacing any existing one
    async fn set(&self, bin_id: &str, record: &BinRecord) -> crate::Result<()>;

    /// Delete the entire collection
    async fn remove_all(&self) -> crate::Result<()>;

    /// Follow the collection. The first snapshot is the current state,
    /// every later one follows a single change.
    async fn subscribe(&self) -> crate::Result<Box<dyn Subscription>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    bins: BinCollection,
    subscribers: Vec<mpsc::UnboundedSender<BinCollection>>,
}

impl MemoryInner {
    fn publish(&mut self) {
        let snapshot = &self.bins;
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

/// Store that keeps the collection in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bins(bins: BinCollection) -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                bins,
                subscribers: Vec::new(),
            }),
        }
    }
}

#[async_trait]
impl BinStore for MemoryStore {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self) -> crate::Result<BinCollection> {
        Ok(self.inner.read().await.bins.clone())
    }

    async fn set(&self, bin_id: &str, record: &BinRecord) -> crate::Result<()> {
        tracing::debug!("Setting bin '{}' in memory store", bin_id);
        let mut inner = self.inner.write().await;
        inner.bins.insert(bin_id.to_string(), record.clone());
        inner.publish();
        Ok(())
    }

    async fn remove_all(&self) -> crate::Result<()> {
        tracing::debug!("Clearing memory store");
        let mut inner = self.inner.write().await;
        inner.bins.clear();
        inner.publish();
        Ok(())
    }

    async fn subscribe(&self) -> crate::Result<Box<dyn Subscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.write().await;
        // Receiver is alive, so the initial send cannot fail
        let _ = tx.send(inner.bins.clone());
        inner.subscribers.push(tx);
        tracing::debug!(
            "Memory store subscriber added ({} active)",
            inner.subscribers.len()
        );
        Ok(Box::new(MemorySubscription { rx }))
    }
}

struct MemorySubscription {
    rx: mpsc::UnboundedReceiver<BinCollection>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Option<crate::Result<BinCollection>> {
        self.rx.recv().await.map(Ok)
    }
}
