//! Router tests: webhook handling end to end against an in-memory backend

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use plex_dubs_config::{CollectionTarget, Config, FileConfig};
use plex_dubs_core::{BackendError, CollectionBackend, EventProcessor};
use plex_dubs_models::{LibraryKind, MediaEvent, MediaId};
use plexdubs_cli::{build_router, AppState};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

#[derive(Default)]
struct MemoryBackend {
    added: Mutex<Vec<MediaId>>,
}

impl MemoryBackend {
    fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().iter().map(|id| id.to_string()).collect()
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn add_item(&self, _target: &CollectionTarget, event: &MediaEvent) -> Result<(), BackendError> {
        self.added.lock().unwrap().push(event.media_id.clone());
        Ok(())
    }

    async fn remove_item(&self, _target: &CollectionTarget, _media_id: &MediaId) -> Result<(), BackendError> {
        Ok(())
    }
}

struct TestApp {
    router: Router,
    processor: EventProcessor,
    backend: Arc<MemoryBackend>,
}

/// Series library only; movies are deliberately left unconfigured
fn setup_app(sonarr_tag: Option<&str>) -> TestApp {
    let file = FileConfig {
        plex_url: Some("http://plex.test:32400".to_string()),
        plex_token: Some("token".to_string()),
        plex_anime_series: Some("Anime".to_string()),
        sonarr_anime_tag: sonarr_tag.map(str::to_string),
        ..FileConfig::default()
    };
    let config = Config::from_sources(file, |_| None).unwrap();

    let backend = Arc::new(MemoryBackend::default());
    let processor = EventProcessor::from_config(&config, backend.clone(), None).unwrap();
    let router = build_router(AppState::new(Arc::new(config), processor.clone()));

    TestApp {
        router,
        processor,
        backend,
    }
}

fn post(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn sonarr_event(event_type: &str, episode_id: u64, extra: &str) -> String {
    format!(
        r#"{{
            "eventType": "{event_type}",
            {extra}
            "series": {{"title": "Dandadan", "tags": ["anime"]}},
            "episodes": [{{"id": {episode_id}, "seasonNumber": 1, "episodeNumber": 5, "airDate": "{today}"}}],
            "episodeFile": {{"mediaInfo": {{"audioLanguages": ["jpn", "eng"]}}}}
        }}"#,
        today = Utc::now().date_naive().format("%Y-%m-%d"),
    )
}

/// Processing runs in a spawned task; poll until `check` holds
async fn eventually<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(None);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "plexdubs");
    assert_eq!(body["libraries"], serde_json::json!(["Anime"]));
}

#[tokio::test]
async fn test_recent_dub_is_added() {
    let app = setup_app(None);
    let response = app
        .router
        .oneshot(post("/sonarr", sonarr_event("Download", 42, "")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Webhook received");

    let backend = app.backend.clone();
    assert!(eventually(|| { let b = backend.clone(); async move { b.added() == vec!["42"] } }).await);
}

#[tokio::test]
async fn test_upgrade_delete_suppresses_redownload() {
    let app = setup_app(None);

    let response = app
        .router
        .clone()
        .oneshot(post("/sonarr", sonarr_event("EpisodeFileDelete", 42, r#""deleteReason": "upgrade","#)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let processor = app.processor.clone();
    let registered = eventually(|| {
        let processor = processor.clone();
        async move {
            let state = processor.state().lock().await;
            state
                .registry(LibraryKind::Series)
                .is_some_and(|r| r.contains(&MediaId::from("42")))
        }
    })
    .await;
    assert!(registered);

    let response = app
        .router
        .oneshot(post("/sonarr", sonarr_event("Download", 42, "")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(app.backend.added().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let app = setup_app(None);
    let response = app.router.oneshot(post("/sonarr", "{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unconfigured_library_is_server_error() {
    let app = setup_app(None);
    let payload = r#"{
        "eventType": "Download",
        "movie": {"id": 7, "title": "Perfect Blue"},
        "movieFile": {"mediaInfo": {"audioLanguages": ["eng"]}}
    }"#;
    let response = app.router.oneshot(post("/radarr", payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["code"], "LIBRARY_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_irrelevant_event_ignored() {
    let app = setup_app(None);
    let response = app
        .router
        .oneshot(post("/sonarr", r#"{"eventType": "Test"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Webhook ignored");
}

#[tokio::test]
async fn test_untagged_series_filtered() {
    let app = setup_app(Some("dubbed-anime"));
    let response = app
        .router
        .oneshot(post("/sonarr", sonarr_event("Download", 42, "")))
        .await
        .unwrap();

    assert_eq!(body_text(response).await, "Webhook ignored");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.backend.added().is_empty());
}
