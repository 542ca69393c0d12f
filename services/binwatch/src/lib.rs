//! Binwatch - Waste bin fill monitoring and alerting service
//!
//! Follows a realtime bin collection, derives fill levels and aggregate
//! statistics for a web dashboard, and sends alerts when bins cross the
//! full or alert thresholds.

pub mod config;
pub mod dashboard;
pub mod emailjs;
pub mod engine;
pub mod error;
pub mod fill;
pub mod firebase;
pub mod io;
pub mod log_notifier;
pub mod notifier;
pub mod record;
pub mod reducer;
pub mod state;
pub mod store;
pub mod testdata;

pub use config::{load_config, Config};
pub use error::{BinwatchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{NotifierConfig, StoreConfig};
use crate::dashboard::DashboardState;
use crate::emailjs::EmailJsNotifier;
use crate::engine::Engine;
use crate::firebase::FirebaseStore;
use crate::io::ReqwestHttpClient;
use crate::log_notifier::LogNotifier;
use crate::notifier::Notifier;
use crate::store::{BinStore, MemoryStore};

/// Build the configured store
pub fn build_store(
    config: &StoreConfig,
    http: Arc<dyn io::HttpClient>,
) -> Result<Arc<dyn BinStore>> {
    let store: Arc<dyn BinStore> = match config {
        StoreConfig::Firebase { .. } => Arc::new(FirebaseStore::new(config, http)?),
        StoreConfig::Memory { .. } => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Build the configured notifiers
pub fn build_notifiers(
    configs: &[NotifierConfig],
    http: Arc<dyn io::HttpClient>,
) -> Result<Vec<Arc<dyn Notifier>>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    for notifier_config in configs {
        let notifier: Arc<dyn Notifier> = match notifier_config {
            NotifierConfig::EmailJs { .. } => {
                Arc::new(EmailJsNotifier::new(notifier_config, Arc::clone(&http))?)
            }
            NotifierConfig::Log => Arc::new(LogNotifier::new()),
        };
        notifiers.push(notifier);
    }
    Ok(notifiers)
}

/// Run the binwatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::new());
    let cancel = CancellationToken::new();

    let store = build_store(&config.store, Arc::clone(&http))?;
    let notifiers = build_notifiers(&config.notifiers, Arc::clone(&http))?;
    let state = state::new_state_handle(config.dashboard.history_size);

    tracing::debug!(
        "Store: {}, Notifiers: {}",
        store.type_name(),
        notifiers.len()
    );

    // Bind before starting the engine so a taken port fails startup
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind dashboard to port {}: {}", config.server.port, e);
        BinwatchError::from(e)
    })?;

    let engine = Engine::new(
        Arc::clone(&store),
        notifiers,
        Arc::clone(&state),
        Duration::from_millis(config.store.reconnect_interval_ms()),
        cancel.clone(),
    );

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let dashboard_state = DashboardState {
        state: Arc::clone(&state),
        store,
        client_config: Arc::from(config.client_config_script()),
        refresh_interval_ms: config.dashboard.refresh_interval_ms,
    };
    let router = dashboard::build_router(dashboard_state, config.server.public_dir.as_deref());
    let cancel_for_dashboard = cancel.clone();
    let server = tokio::spawn(async move {
        tracing::info!("Server running on http://localhost:{}", addr.port());
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_for_dashboard.cancelled().await;
            })
            .await
        {
            tracing::error!("Dashboard server failed: {}", e);
        }
        tracing::debug!("Dashboard stopped");
    });

    tracing::info!("Binwatch engine started");

    // Run the engine (blocks until cancelled)
    engine.run().await;
    let _ = server.await;

    tracing::info!("Binwatch engine stopped");
    Ok(())
}
