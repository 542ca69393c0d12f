//! Notifier trait for sending bin alerts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::reducer::{AlertEffect, AlertKind};

/// A bin alert to be delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub bin_id: String,
    pub fill_percentage: u8,
    pub kind: AlertKind,
}

impl From<&AlertEffect> for Notification {
    fn from(effect: &AlertEffect) -> Self {
        Self {
            bin_id: effect.bin_id.clone(),
            fill_percentage: effect.fill_percentage,
            kind: effect.kind,
        }
    }
}

/// Record of a delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub bin_id: String,
    pub kind: AlertKind,
    pub fill_percentage: u8,
    pub notifier_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Trait for sending notifications
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "emailjs")
    fn type_name(&self) -> &str;

    /// Send a notification
    async fn notify(&self, notification: &Notification) -> crate::Result<()>;
}
