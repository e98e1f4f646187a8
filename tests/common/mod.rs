//! Shared helpers for the HTTP integration tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::Value;

use carbon_tracker::api;
use carbon_tracker::app_state::AppState;
use carbon_tracker::domain::{EmissionFactorTable, EventBus, TipCatalog};
use carbon_tracker::persistence::{MemoryStore, Store};
use carbon_tracker::service::{
    EmissionService, LogMailer, NotificationDispatcher, NotificationWorker, SubscriptionService,
};

const FACTORS: &str = include_str!("../../data/emission_factors.json");

/// Router over a fresh in-memory store, plus the bus notification
/// outcomes are published on.
pub fn create_test_app() -> (Router, EventBus) {
    let Ok(factors) = EmissionFactorTable::from_json_str(FACTORS) else {
        panic!("bundled factor table should parse");
    };
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let events = EventBus::new(64);
    let worker = NotificationWorker::new(
        Arc::new(LogMailer::default()),
        TipCatalog::default(),
        "noreply@carbontracker.com".to_string(),
        events.clone(),
    );
    let (dispatcher, _handle) = NotificationDispatcher::start(worker, 64);

    let state = AppState::new(
        EmissionService::new(Arc::new(factors), Arc::clone(&store)),
        SubscriptionService::new(store, dispatcher),
    );
    (api::build_router().with_state(state), events)
}

pub fn get(uri: &str) -> Request<Body> {
    let Ok(req) = Request::builder().method("GET").uri(uri).body(Body::empty()) else {
        panic!("request should build");
    };
    req
}

pub fn post_empty(uri: &str) -> Request<Body> {
    let Ok(req) = Request::builder().method("POST").uri(uri).body(Body::empty()) else {
        panic!("request should build");
    };
    req
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    let Ok(req) = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
    else {
        panic!("request should build");
    };
    req
}

/// Splits a response into its status and parsed JSON body.
pub async fn json_body(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    let Ok(value) = serde_json::from_slice(&bytes) else {
        panic!("body should be JSON: {}", String::from_utf8_lossy(&bytes));
    };
    (status, value)
}
