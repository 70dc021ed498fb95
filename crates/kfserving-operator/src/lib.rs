//! KFServing operator
//!
//! Serves the InferenceService admission webhooks. Every request is resolved
//! against the current runtime registry snapshot, which a background
//! ConfigMap watch keeps up to date.

#![deny(missing_docs)]

pub mod server;
pub mod webhook;

pub use server::{serve, ServerConfig, TlsPaths};
pub use webhook::{webhook_router, WebhookError, WebhookState};
