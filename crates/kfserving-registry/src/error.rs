//! Registry errors

use thiserror::Error;

use crate::registry::RegistryNamespace;

/// Why a single registry entry was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntryDefect {
    /// `image` is missing or empty
    #[error("image is required")]
    MissingImage,

    /// `defaultImageVersion` is missing or empty
    #[error("defaultImageVersion is required")]
    MissingDefaultVersion,

    /// `allowedImageVersions` is missing or empty
    #[error("allowedImageVersions must not be empty")]
    EmptyAllowedVersions,

    /// `defaultImageVersion` is not in `allowedImageVersions`
    #[error("defaultImageVersion '{0}' is not in allowedImageVersions")]
    DefaultNotAllowed(String),

    /// `defaultGPUImageVersion` is not in `allowedImageVersions`
    #[error("defaultGPUImageVersion '{0}' is not in allowedImageVersions")]
    GpuDefaultNotAllowed(String),

    /// The framework name appears more than once in its namespace
    #[error("framework is declared more than once")]
    Duplicate,
}

/// A registry payload that could not be loaded
///
/// Loading is whole-or-nothing, so any of these rejects the entire payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload (or one namespace of it) is not valid JSON of the expected shape
    #[error("malformed registry payload{}: {message}", namespace.as_ref().map(|n| format!(" [{n}]")).unwrap_or_default())]
    Malformed {
        /// Namespace being parsed, when the payload is split per namespace
        namespace: Option<RegistryNamespace>,
        /// Parser message
        message: String,
    },

    /// A required namespace is absent
    #[error("registry namespace '{0}' is missing")]
    MissingNamespace(RegistryNamespace),

    /// An entry violates a registry invariant
    #[error("invalid registry entry {namespace}/{framework}: {defect}")]
    InvalidEntry {
        /// Namespace holding the entry
        namespace: RegistryNamespace,
        /// Framework name of the entry
        framework: String,
        /// What is wrong with it
        defect: EntryDefect,
    },
}

/// Framework lookup miss
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("framework '{framework}' is not registered in {namespace}")]
pub struct NotFound {
    /// Namespace that was searched
    pub namespace: RegistryNamespace,
    /// Framework name that was requested
    pub framework: String,
}

/// Errors from publishing into a [`crate::RegistryStore`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The new payload failed validation; the previous snapshot is kept
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The store was closed and no longer publishes snapshots
    #[error("registry store is closed")]
    Closed,
}
