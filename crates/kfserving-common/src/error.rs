//! Error types for the KFServing controller
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the config key or context it relates to.

use thiserror::Error;

/// Main error type for KFServing operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Controller configuration error (registry ConfigMap, CLI flags)
    #[error("configuration error [{key}]: {message}")]
    Config {
        /// Config key or flag that was rejected
        key: String,
        /// Description of what's wrong
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "webhook", "watcher")
        context: String,
    },
}

impl Error {
    /// Create a configuration error for the given key
    pub fn config(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Configuration errors need an operator fix. Kubernetes errors are
    /// retried unless they are 4xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Config { .. } => false,
            Error::Internal { .. } => true,
        }
    }
}
