#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mailivo_api::config::ServerConfig;
use mailivo_api::router::build_app_router;
use mailivo_api::state::AppState;
use mailivo_engine::memory::{
    InMemoryAutomationStore, InMemoryExecutionLog, InMemoryListings, InMemoryTemplates, RecordingCampaignService,
};
use mailivo_engine::{Collaborators, Dispatcher, EngineConfig};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        database_url: String::new(),
        landivo_api_url: "http://landivo.test".to_string(),
        mailivo_api_url: "http://mailivo.test".to_string(),
        mailivo_api_token: None,
        upstream_timeout_secs: 5,
        scheduler_enabled: false,
        engine: EngineConfig::default(),
    }
}

/// The application wired to in-memory collaborators, with handles to them.
pub struct TestApp {
    pub router: Router,
    pub listings: Arc<InMemoryListings>,
    pub campaigns: Arc<RecordingCampaignService>,
    pub executions: Arc<InMemoryExecutionLog>,
}

/// Build the full application router with all middleware layers. No
/// database is involved.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let automations = Arc::new(InMemoryAutomationStore::new());
    let listings = Arc::new(InMemoryListings::new());
    let campaigns = Arc::new(RecordingCampaignService::new());
    let executions = Arc::new(InMemoryExecutionLog::new());

    let dispatcher = Arc::new(Dispatcher::new(
        Collaborators {
            automations: automations.clone(),
            properties: listings.clone(),
            buyers: listings.clone(),
            templates: Arc::new(InMemoryTemplates::new()),
            campaigns: campaigns.clone(),
            executions: executions.clone(),
        },
        &config.engine,
    ));

    let state = AppState {
        automations,
        executions: executions.clone(),
        dispatcher,
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        listings,
        campaigns,
        executions,
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(body)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
