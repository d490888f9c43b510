//! HTTP trigger surface, health and Prometheus endpoints.

pub mod metrics;
pub mod state;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use meeting_light_rs::{ConfigStore, DeviceNetwork, MeetingLight, StatusColor};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::web::metrics::Metrics;
use crate::web::state::ServiceState;

/// Shared with every handler.
pub struct AppState<N, S> {
    pub service: Arc<MeetingLight<N, S>>,
    pub state: ServiceState,
    pub metrics_handle: PrometheusHandle,
    /// `None` when polling is off.
    pub poll_interval: Option<Duration>,
}

impl<N, S> AppState<N, S> {
    /// Unhealthy once three poll intervals pass without a reconciliation.
    fn health_window(&self) -> Option<Duration> {
        self.poll_interval.map(|interval| interval * 3)
    }
}

impl<N, S> Clone for AppState<N, S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            state: self.state.clone(),
            metrics_handle: self.metrics_handle.clone(),
            poll_interval: self.poll_interval,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MeetingParams {
    meeting_id: Option<String>,
}

pub fn router<N, S>(app_state: AppState<N, S>) -> Router
where
    N: DeviceNetwork + 'static,
    S: ConfigStore + 'static,
{
    Router::new()
        .route(
            "/in_meeting",
            get(in_meeting_query::<N, S>).post(in_meeting_json::<N, S>),
        )
        .route("/out_meeting", get(out_meeting::<N, S>))
        .route("/ongoing_meeting", get(ongoing_meeting::<N, S>))
        .route("/upcoming_meeting", get(upcoming_meeting::<N, S>))
        .route("/status", get(status_handler::<N, S>))
        .route("/health", get(health_handler::<N, S>))
        .route("/metrics", get(metrics_handler::<N, S>))
        .route("/api/status", get(api_status_handler::<N, S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Binds `port` on all interfaces and serves in the background.
pub async fn start_web_server<N, S>(port: u16, app_state: AppState<N, S>) -> std::io::Result<()>
where
    N: DeviceNetwork + 'static,
    S: ConfigStore + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting web server on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    let app = router(app_state);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    Ok(())
}

async fn trigger<N, S>(
    app: &AppState<N, S>,
    color: StatusColor,
    meeting_id: Option<&str>,
) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    let actuation = match color {
        StatusColor::Joined => app.service.set_joined(meeting_id).await,
        other => app.service.set_color(other).await,
    };
    info!("Trigger {}: {}", color, actuation.as_str());
    app.state.record_trigger(color, &actuation);
    Metrics::record_trigger(color, &actuation);
    status_json(app).await
}

async fn status_json<N, S>(app: &AppState<N, S>) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    (StatusCode::OK, Json(app.service.status().await)).into_response()
}

async fn in_meeting_query<N, S>(
    State(app): State<AppState<N, S>>,
    Query(params): Query<MeetingParams>,
) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    trigger(&app, StatusColor::Joined, params.meeting_id.as_deref()).await
}

async fn in_meeting_json<N, S>(
    State(app): State<AppState<N, S>>,
    payload: Result<Json<MeetingParams>, JsonRejection>,
) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    match payload {
        Ok(Json(params)) => trigger(&app, StatusColor::Joined, params.meeting_id.as_deref()).await,
        Err(rejection) => (
            rejection.status(),
            Json(serde_json::json!({ "error": rejection.body_text() })),
        )
            .into_response(),
    }
}

async fn out_meeting<N, S>(State(app): State<AppState<N, S>>) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    trigger(&app, StatusColor::Free, None).await
}

async fn ongoing_meeting<N, S>(State(app): State<AppState<N, S>>) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    trigger(&app, StatusColor::Ongoing, None).await
}

async fn upcoming_meeting<N, S>(State(app): State<AppState<N, S>>) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    trigger(&app, StatusColor::Upcoming, None).await
}

async fn status_handler<N, S>(State(app): State<AppState<N, S>>) -> Response
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    status_json(&app).await
}

async fn health_handler<N, S>(State(app): State<AppState<N, S>>) -> Response {
    if app.state.is_healthy(app.health_window()) {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "UNHEALTHY").into_response()
    }
}

async fn metrics_handler<N, S>(State(app): State<AppState<N, S>>) -> Response {
    Metrics::set_uptime(app.state.start_time());

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        app.metrics_handle.render(),
    )
        .into_response()
}

async fn api_status_handler<N, S>(State(app): State<AppState<N, S>>) -> Response {
    let summary = app.state.summary();

    let json = serde_json::json!({
        "status": "ok",
        "uptime": summary.uptime_display(),
        "service": summary,
        "poll_interval_seconds": app.poll_interval.map(|i| i.as_secs()),
    });

    (StatusCode::OK, Json(json)).into_response()
}
