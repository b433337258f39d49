use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use plex_dubs_config::Config;
use plex_dubs_core::{EventProcessor, Outcome};
use plex_dubs_models::MediaEvent;
use plex_dubs_sources::{parse_radarr, parse_sonarr, passes_tag_filter, PayloadError};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const WEBHOOK_RECEIVED: &str = "Webhook received";
pub const WEBHOOK_IGNORED: &str = "Webhook ignored";

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub processor: EventProcessor,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<Config>, processor: EventProcessor) -> Self {
        Self {
            config,
            processor,
            started_at: Utc::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sonarr", post(sonarr_webhook))
        .route("/radarr", post(radarr_webhook))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /sonarr
pub async fn sonarr_webhook(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    let event = parse_sonarr(&body).map_err(|e| malformed("sonarr", e))?;
    accept_event(state, event, "sonarr").await
}

/// POST /radarr
pub async fn radarr_webhook(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    let event = parse_radarr(&body).map_err(|e| malformed("radarr", e))?;
    accept_event(state, event, "radarr").await
}

fn malformed(source: &str, err: PayloadError) -> ApiError {
    warn!(operation = "webhook_rejected", source, error = %err, "Malformed webhook payload");
    ApiError::from(err)
}

/// Validate a parsed event, then process it in the background so the
/// webhook sender is answered immediately.
async fn accept_event(state: AppState, event: Option<MediaEvent>, source: &str) -> ApiResult<&'static str> {
    let Some(event) = event else {
        debug!(source, "Event type not relevant");
        return Ok(WEBHOOK_IGNORED);
    };

    if !passes_tag_filter(&event, &state.config) {
        info!(
            operation = "webhook_filtered",
            source,
            media_id = %event.media_id,
            title = %event.display_title(),
            "Missing anime tag, ignoring"
        );
        return Ok(WEBHOOK_IGNORED);
    }

    state.processor.target(event.library_kind).await?;

    info!(
        operation = "webhook_received",
        source,
        event_kind = %event.event_kind,
        media_id = %event.media_id,
        title = %event.display_title(),
        "Processing webhook"
    );

    let processor = state.processor.clone();
    tokio::spawn(async move {
        match processor.process(&event).await {
            Ok(Outcome::Ignored(reason)) => {
                info!(media_id = %event.media_id, title = %event.display_title(), "Ignored: {}", reason);
            }
            Ok(outcome) => {
                debug!(media_id = %event.media_id, ?outcome, "Webhook processed");
            }
            Err(e) => {
                error!(
                    operation = "webhook_failed",
                    media_id = %event.media_id,
                    title = %event.display_title(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Failed to process webhook"
                );
            }
        }
    });

    Ok(WEBHOOK_RECEIVED)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Library sections with a managed collection
    pub libraries: Vec<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.started_at);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "plexdubs".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        libraries: state
            .config
            .targets()
            .into_iter()
            .map(|target| target.library_section)
            .collect(),
    })
}
