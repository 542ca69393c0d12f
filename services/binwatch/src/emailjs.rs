//! EmailJS notification client

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::config::NotifierConfig;
use crate::io::HttpClient;
use crate::notifier::{Notification, Notifier};

const EMAILJS_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// EmailJS email sender
pub struct EmailJsNotifier {
    service_id: String,
    template_id: String,
    public_key: String,
    private_key: Option<String>,
    to_email: String,
    from_email: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for EmailJsNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsNotifier")
            .field("service_id", &self.service_id)
            .field("template_id", &self.template_id)
            .finish()
    }
}

impl EmailJsNotifier {
    /// Build a notifier from an emailjs notifier config.
    ///
    /// Returns a configuration error for any other notifier type.
    pub fn new(config: &NotifierConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let NotifierConfig::EmailJs {
            service_id,
            template_id,
            public_key,
            private_key,
            to_email,
            from_email,
        } = config
        else {
            return Err(crate::BinwatchError::Config(format!(
                "Expected an emailjs notifier, got '{}'",
                config.type_name()
            )));
        };

        tracing::debug!(
            "Created EmailJsNotifier for service '{}' template '{}'",
            service_id,
            template_id
        );

        Ok(Self {
            service_id: service_id.clone(),
            template_id: template_id.clone(),
            public_key: public_key.clone(),
            private_key: private_key.clone(),
            to_email: to_email.clone(),
            from_email: from_email.clone(),
            http,
        })
    }

    fn request_body(&self, notification: &Notification) -> serde_json::Value {
        let mut body = json!({
            "service_id": self.service_id,
            "template_id": self.template_id,
            "user_id": self.public_key,
            "template_params": {
                "to_email": self.to_email,
                "email": self.from_email,
                "bin_id": notification.bin_id,
                "fill_percentage": notification.fill_percentage,
            },
        });
        if let Some(private_key) = &self.private_key {
            body["accessToken"] = json!(private_key);
        }
        body
    }
}

#[async_trait]
impl Notifier for EmailJsNotifier {
    fn type_name(&self) -> &str {
        "emailjs"
    }

    async fn notify(&self, notification: &Notification) -> crate::Result<()> {
        tracing::debug!(
            "Sending EmailJS {} alert for bin '{}' at {}%",
            notification.kind,
            notification.bin_id,
            notification.fill_percentage
        );

        let response = self
            .http
            .post_json(EMAILJS_API_URL, &self.request_body(notification))
            .await?;

        if response.status != 200 {
            return Err(crate::BinwatchError::Notifier(format!(
                "EmailJS API returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("EmailJS alert sent for bin '{}'", notification.bin_id);
        Ok(())
    }
}
