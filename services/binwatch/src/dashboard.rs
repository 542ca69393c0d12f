//! Web dashboard, JSON API, operator actions and static file serving

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::reducer::{BinView, DashboardView, HISTOGRAM_LABELS};
use crate::state::StateHandle;
use crate::store::BinStore;

const HISTOGRAM_COLORS: [&str; 4] = ["#2ecc71", "#3498db", "#f39c12", "#e74c3c"];

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub store: Arc<dyn BinStore>,
    pub client_config: Arc<str>,
    pub refresh_interval_ms: u64,
}

/// Build the dashboard axum router.
///
/// Requests that match no route are served from `public_dir` when given.
pub fn build_router(dashboard: DashboardState, public_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/", get(index_handler))
        .route("/partials/board", get(board_handler))
        .route("/config.js", get(config_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/history", get(history_handler))
        .route("/api/bins", delete(clear_handler))
        .route("/api/bins/test", post(test_data_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard);

    match public_dir {
        Some(dir) => {
            tracing::debug!("Serving static files from {:?}", dir);
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    }
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    Html(render_page(&state.view, dashboard.refresh_interval_ms))
}

async fn board_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    Html(render_board(&state.view))
}

async fn config_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        dashboard.client_config.to_string(),
    )
}

async fn dashboard_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    axum::Json(state.view.clone())
}

async fn history_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    let history: Vec<_> = state.history.iter().cloned().collect();
    axum::Json(history)
}

#[derive(Debug, Deserialize)]
struct ClearParams {
    #[serde(default)]
    confirm: bool,
}

async fn clear_handler(
    State(dashboard): State<DashboardState>,
    Query(params): Query<ClearParams>,
) -> Response {
    if !params.confirm {
        return (
            StatusCode::BAD_REQUEST,
            "Clearing all bins requires confirm=true",
        )
            .into_response();
    }

    match dashboard.store.remove_all().await {
        Ok(()) => {
            tracing::info!("Data cleared");
            dashboard.state.write().await.reset_view();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::warn!("Error clearing data: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn test_data_handler(State(dashboard): State<DashboardState>) -> Response {
    let (bin_id, record) = {
        let mut rng = rand::thread_rng();
        crate::testdata::random_bin(&mut rng, crate::engine::current_epoch_ms() as i64)
    };

    match dashboard.store.set(&bin_id, &record).await {
        Ok(()) => {
            tracing::info!("Test data added for bin {}", bin_id);
            (
                StatusCode::CREATED,
                axum::Json(serde_json::json!({ "bin_id": bin_id, "record": record })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Error adding test data: {}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// Full dashboard page around the board fragment
pub fn render_page(view: &DashboardView, refresh_interval_ms: u64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Smart Bin Dashboard</title>
    <script src="/config.js"></script>
    <style>{style}</style>
</head>
<body>
    <header>
        <h1>Smart Bin Dashboard</h1>
        <div id="currentTime"></div>
        <div class="actions">
            <button id="addTestData" onclick="addTestData()">Add Test Data</button>
            <button id="clearData" onclick="clearData()">Clear Data</button>
        </div>
    </header>
    <main id="board">{board}</main>
    <script>
        function updateCurrentTime() {{
            document.getElementById('currentTime').textContent = new Date().toLocaleString();
        }}
        function localizeTimestamps() {{
            document.querySelectorAll('[data-epoch]').forEach(el => {{
                el.textContent = new Date(Number(el.dataset.epoch)).toLocaleString();
            }});
        }}
        function refreshBoard() {{
            fetch('/partials/board')
                .then(r => r.text())
                .then(html => {{
                    document.getElementById('board').innerHTML = html;
                    localizeTimestamps();
                }});
        }}
        function addTestData() {{
            fetch('/api/bins/test', {{ method: 'POST' }})
                .then(r => r.ok ? r.json() : Promise.reject(r.status))
                .then(data => {{ console.log('Test data added for bin', data.bin_id); refreshBoard(); }})
                .catch(error => console.error('Error adding test data:', error));
        }}
        function clearData() {{
            if (confirm('Are you sure you want to delete all data?')) {{
                fetch('/api/bins?confirm=true', {{ method: 'DELETE' }})
                    .then(r => r.ok ? refreshBoard() : Promise.reject(r.status))
                    .catch(error => console.error('Error clearing data:', error));
            }}
        }}
        updateCurrentTime();
        localizeTimestamps();
        setInterval(updateCurrentTime, 1000);
        setInterval(refreshBoard, {refresh});
    </script>
</body>
</html>"#,
        style = PAGE_STYLE,
        board = render_board(view),
        refresh = refresh_interval_ms,
    )
}

/// Stat tiles plus either the empty state or the histogram and cards
pub fn render_board(view: &DashboardView) -> String {
    let stats = &view.stats;
    let mut html = format!(
        r#"<section class="stats">
    <div class="stat"><div class="stat-value" id="totalBins">{}</div><div class="stat-label">Total Bins</div></div>
    <div class="stat"><div class="stat-value" id="alertBins">{}</div><div class="stat-label">Alert Bins</div></div>
    <div class="stat"><div class="stat-value" id="fullBins">{}</div><div class="stat-label">Full Bins</div></div>
    <div class="stat"><div class="stat-value" id="avgFill">{}%</div><div class="stat-label">Average Fill</div></div>
</section>
"#,
        stats.total_bins, stats.alert_bins, stats.full_bins, stats.avg_fill_percentage
    );

    if view.empty {
        html.push_str(
            r#"<div id="noDataMessage" class="no-data">No bin data available. Waiting for sensor readings...</div>"#,
        );
        return html;
    }

    html.push_str(r#"<section id="chartsRow" class="charts"><h2>Fill Level Distribution</h2><div class="histogram">"#);
    let max = view.histogram.buckets.iter().copied().max().unwrap_or(0).max(1);
    for ((count, label), color) in view
        .histogram
        .buckets
        .iter()
        .zip(HISTOGRAM_LABELS)
        .zip(HISTOGRAM_COLORS)
    {
        html.push_str(&format!(
            r#"<div class="bar"><div class="bar-count">{count}</div><div class="bar-fill" style="height: {height}%; background: {color};"></div><div class="bar-label">{label}</div></div>"#,
            height = count * 100 / max,
        ));
    }
    html.push_str("</div></section>\n");

    html.push_str(r#"<section id="dashboard" class="cards">"#);
    for bin in &view.bins {
        html.push_str(&render_card(bin));
    }
    html.push_str("</section>\n");
    html
}

fn render_card(bin: &BinView) -> String {
    let id = escape_html(&bin.id);
    let class = &bin.status_class;
    let badge = if bin.is_alert {
        r#"<div class="alert-badge">&#9888; ALERT</div>"#
    } else {
        ""
    };
    let mismatch = if bin.stored_fill_mismatch {
        r#"<div class="mismatch" title="Stored fill percentage differs from the sensor reading">stored fill differs</div>"#
    } else {
        ""
    };
    let timestamp = match bin
        .timestamp_epoch_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
    {
        Some(dt) => format!(
            r#"<div class="timestamp" data-epoch="{}">{}</div>"#,
            dt.timestamp_millis(),
            dt.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => r#"<div class="timestamp">Unknown time</div>"#.to_string(),
    };

    format!(
        r#"<div class="card">
    <div class="card-status status-{class}"></div>
    <div class="card-body">
        {badge}
        <div class="bin-header">
            <div class="bin-id">Bin #{id}</div>
            <div class="bin-status"><span class="status-indicator status-{class}"></span>{status}</div>
        </div>
        <div class="fill-meter"><div class="fill-level" style="width: {fill}%"></div></div>
        <div class="card-details">
            <div class="detail-item"><div class="detail-value">{fill}%</div><div class="detail-label">FILL LEVEL</div></div>
            <div class="detail-item"><div class="detail-value">{distance} cm</div><div class="detail-label">DISTANCE</div></div>
        </div>
        {mismatch}
        {timestamp}
    </div>
</div>
"#,
        status = bin.status,
        fill = bin.fill_percentage,
        distance = bin.adjusted_distance_cm,
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 1200px; margin: 0 auto; padding: 1rem; background: #f5f7fa; color: #2c3e50; }
header { display: flex; align-items: center; justify-content: space-between; flex-wrap: wrap; gap: 1rem; }
button { padding: 0.5rem 1rem; border: 0; border-radius: 0.25rem; cursor: pointer; color: white; background: #3498db; }
#clearData { background: #e74c3c; }
.stats { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; margin: 1rem 0; }
.stat { background: white; border-radius: 0.5rem; padding: 1rem; text-align: center; box-shadow: 0 2px 4px rgba(0,0,0,0.08); }
.stat-value { font-size: 2rem; font-weight: 700; }
.stat-label, .detail-label { font-size: 0.8rem; color: #7f8c8d; }
.no-data { padding: 2rem; text-align: center; background: white; border-radius: 0.5rem; }
.charts { background: white; border-radius: 0.5rem; padding: 1rem; margin-bottom: 1rem; }
.histogram { display: flex; align-items: flex-end; gap: 1rem; height: 200px; }
.bar { flex: 1; display: flex; flex-direction: column; justify-content: flex-end; height: 100%; text-align: center; }
.bar-fill { border-radius: 5px 5px 0 0; min-height: 2px; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
.card { background: white; border-radius: 0.5rem; overflow: hidden; box-shadow: 0 2px 4px rgba(0,0,0,0.08); }
.card-status { height: 6px; }
.card-body { padding: 1rem; }
.status-full { background: #f39c12; }
.status-not-full { background: #2ecc71; }
.status-alert { background: #e74c3c; }
.status-indicator { display: inline-block; width: 10px; height: 10px; border-radius: 50%; margin-right: 0.4rem; }
.alert-badge { color: #e74c3c; font-weight: 700; margin-bottom: 0.5rem; }
.bin-header, .card-details { display: flex; justify-content: space-between; }
.bin-id { font-weight: 700; }
.fill-meter { height: 10px; background: #ecf0f1; border-radius: 5px; margin: 0.75rem 0; overflow: hidden; }
.fill-level { height: 100%; background: #3498db; }
.mismatch { font-size: 0.75rem; color: #f39c12; margin-top: 0.5rem; }
.timestamp { font-size: 0.8rem; color: #7f8c8d; margin-top: 0.5rem; }
"#;
