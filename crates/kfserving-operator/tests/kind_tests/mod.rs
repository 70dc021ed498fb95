//! Integration tests for KFServing
//!
//! These tests require a Kubernetes cluster (kind) to run and tell the story
//! of how platform operators manage the runtime registry and how users submit
//! InferenceServices.
//!
//! # Test Organization
//!
//! - `crd_operations`: Stories about creating, reading, and deleting
//!   InferenceService resources through the Kubernetes API
//!
//! - `registry_config`: Stories about publishing, updating, and breaking the
//!   runtime registry ConfigMap while the watcher is running
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test -p kfserving-operator --test kind -- --ignored --nocapture
//! ```

mod crd_operations;
mod helpers;
mod registry_config;
