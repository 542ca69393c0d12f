//! Configuration types for the binwatch service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix marking a secret that is read from the environment
const ENV_PREFIX: &str = "env:";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served for any path not handled by the dashboard routes
    #[serde(default)]
    pub public_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_dir: None,
        }
    }
}

/// Realtime store configuration with tagged enum for extensibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreConfig {
    #[serde(rename = "firebase")]
    Firebase {
        database_url: String,
        #[serde(default = "default_collection_path")]
        collection_path: String,
        #[serde(default)]
        auth_key: Option<String>,
        #[serde(default = "default_reconnect_interval_ms")]
        reconnect_interval_ms: u64,
    },
    #[serde(rename = "memory")]
    Memory {
        #[serde(default = "default_reconnect_interval_ms")]
        reconnect_interval_ms: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl StoreConfig {
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Firebase { .. } => "firebase",
            StoreConfig::Memory { .. } => "memory",
        }
    }

    pub fn reconnect_interval_ms(&self) -> u64 {
        match self {
            StoreConfig::Firebase {
                reconnect_interval_ms,
                ..
            }
            | StoreConfig::Memory {
                reconnect_interval_ms,
            } => *reconnect_interval_ms,
        }
    }
}

/// Notifier configuration with tagged enum for extensibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifierConfig {
    #[serde(rename = "emailjs")]
    EmailJs {
        service_id: String,
        template_id: String,
        public_key: String,
        #[serde(default)]
        private_key: Option<String>,
        to_email: String,
        #[serde(default)]
        from_email: String,
    },
    #[serde(rename = "log")]
    Log,
}

impl NotifierConfig {
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::EmailJs { .. } => "emailjs",
            NotifierConfig::Log => "log",
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_collection_path() -> String {
    "waste_bin_data".to_string()
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

fn default_history_size() -> usize {
    100
}

fn default_refresh_interval_ms() -> u64 {
    2000
}

impl Config {
    /// Replace `env:NAME` secret values with the named environment variable
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if let StoreConfig::Firebase {
            auth_key: Some(auth_key),
            ..
        } = &mut self.store
        {
            resolve_secret(auth_key)?;
        }

        for notifier in &mut self.notifiers {
            if let NotifierConfig::EmailJs {
                public_key,
                private_key,
                ..
            } = notifier
            {
                resolve_secret(public_key)?;
                if let Some(private_key) = private_key {
                    resolve_secret(private_key)?;
                }
            }
        }
        Ok(())
    }

    /// Browser configuration script served at `/config.js`.
    ///
    /// Only public identifiers are included; private keys stay server side.
    pub fn client_config_script(&self) -> String {
        let firebase = match &self.store {
            StoreConfig::Firebase {
                database_url,
                collection_path,
                auth_key,
                ..
            } => serde_json::json!({
                "databaseURL": database_url,
                "apiKey": auth_key,
                "collectionPath": collection_path,
            }),
            StoreConfig::Memory { .. } => serde_json::json!({}),
        };

        let emailjs = self
            .notifiers
            .iter()
            .find_map(|n| match n {
                NotifierConfig::EmailJs {
                    service_id,
                    template_id,
                    public_key,
                    ..
                } => Some(serde_json::json!({
                    "serviceId": service_id,
                    "templateId": template_id,
                    "publicKey": public_key,
                })),
                NotifierConfig::Log => None,
            })
            .unwrap_or_else(|| serde_json::json!({}));

        format!(
            "window.firebaseConfig = {};\nwindow.emailjsConfig = {};\n",
            firebase, emailjs
        )
    }
}

fn resolve_secret(value: &mut String) -> crate::Result<()> {
    if let Some(var) = value.strip_prefix(ENV_PREFIX) {
        let resolved = std::env::var(var).map_err(|_| {
            crate::BinwatchError::Config(format!("Environment variable {} is not set", var))
        })?;
        *value = resolved;
    }
    Ok(())
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::BinwatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
