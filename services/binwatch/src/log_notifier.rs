//! Notifier that only writes alerts to the log

use async_trait::async_trait;

use crate::notifier::{Notification, Notifier};

/// Emits a warning log line per alert and always succeeds
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn type_name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        tracing::warn!(
            bin_id = %notification.bin_id,
            fill_percentage = notification.fill_percentage,
            kind = %notification.kind,
            "Bin threshold crossed"
        );
        Ok(())
    }
}
