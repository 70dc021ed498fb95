//! Admission webhook router

mod inference_service;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{extract::State, Router};

use kfserving_registry::RegistryStore;

pub use inference_service::{mutate_handler, validate_handler, WebhookError};

/// Path of the mutating (defaulting) webhook
pub const MUTATE_PATH: &str = "/mutate-inferenceservices";

/// Path of the validating webhook
pub const VALIDATE_PATH: &str = "/validate-inferenceservices";

/// Shared state for webhook handlers
pub struct WebhookState {
    /// Runtime registry snapshots
    pub store: Arc<RegistryStore>,
}

impl WebhookState {
    /// Create state backed by `store`
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self { store }
    }
}

/// Build the webhook router
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate_handler))
        .route(VALIDATE_PATH, post(validate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

/// Ready once a registry snapshot has been published
async fn readyz_handler(State(state): State<Arc<WebhookState>>) -> (StatusCode, &'static str) {
    if state.store.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "runtime registry not loaded")
    }
}
