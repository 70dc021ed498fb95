//! Runtime registry for KFServing
//!
//! Holds the mapping from serving framework name to the container image and
//! versions the platform supports, split into `predictors` and `explainers`:
//! - Parses the registry payload strictly (one bad entry fails the load)
//! - Publishes immutable snapshots that resolvers hold for a whole call
//! - Reloads from the `inferenceservice-config` ConfigMap as it changes

#![deny(missing_docs)]

mod error;
mod registry;
mod store;
pub mod watcher;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{EntryDefect, NotFound, ParseError, StoreError};
pub use registry::{Registry, RegistryNamespace, RuntimeDescriptor};
pub use store::RegistryStore;
