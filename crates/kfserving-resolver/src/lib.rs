//! Spec resolution for KFServing
//!
//! Turns a partially specified framework request into a concrete image
//! reference using one registry snapshot:
//! - [`resolve`] defaults and validates a single [`UserSpec`]
//! - [`resolve_inference_service`] does the same for every endpoint of an
//!   `InferenceService`, and [`apply_defaults`] writes the result back
//!
//! Resolution is pure and synchronous. Every rejection is a terminal,
//! user-facing error; nothing here is retried.

#![deny(missing_docs)]

mod error;
mod inference_service;
mod resolve;

pub use error::{RejectionError, ServiceRejection};
pub use inference_service::{
    apply_defaults, gpu_requested, predictor_framework, resolve_endpoint,
    resolve_inference_service, validate_predictor, validate_storage_uri, EndpointResolution,
    ServiceResolution, DEFAULT_CPU, DEFAULT_MEMORY,
};
pub use resolve::{resolve, ResolvedImage, UserSpec};
