//! Rejection reasons surfaced to the user

use thiserror::Error;

use kfserving_registry::RegistryNamespace;

/// Why a spec could not be resolved
///
/// Messages are written for the admission response, so they say what the
/// user should change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionError {
    /// The framework is not registered in the namespace
    #[error("framework '{framework}' is not available in {namespace}")]
    UnknownFramework {
        /// Namespace that was searched
        namespace: RegistryNamespace,
        /// Requested framework
        framework: String,
    },

    /// GPU requested without a version, but the framework has no GPU default
    #[error(
        "framework '{framework}' has no GPU image version; set runtimeVersion explicitly or remove the GPU request"
    )]
    NoGpuVariant {
        /// Requested framework
        framework: String,
    },

    /// The requested or defaulted version is not permitted
    #[error("runtimeVersion '{version}' is not allowed for '{framework}'; allowed versions: [{}]", allowed.join(", "))]
    VersionNotAllowed {
        /// Requested framework
        framework: String,
        /// Effective version that was rejected
        version: String,
        /// Every permitted version, in registry order
        allowed: Vec<String>,
    },

    /// No predictor framework is set on an endpoint
    #[error("exactly one predictor framework must be specified, found none")]
    NoPredictor,

    /// More than one predictor framework is set on an endpoint
    #[error("exactly one predictor framework must be specified, found: [{}]", frameworks.join(", "))]
    MultiplePredictors {
        /// Every framework that was set
        frameworks: Vec<String>,
    },

    /// An explainer block names no explainer
    #[error("exactly one explainer must be specified, found none")]
    NoExplainer,

    /// Missing or unsupported storage URI
    #[error(
        "storageUri '{uri}' is not supported; use gs://, s3://, pvc://, file://, an Azure blob https:// URI, or a local path"
    )]
    InvalidStorageUri {
        /// The rejected URI
        uri: String,
    },
}

impl RejectionError {
    /// Rejections depend only on the input and the registry, so retrying the
    /// same request cannot succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// A rejection located at a field of an InferenceService
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ServiceRejection {
    /// Field path, e.g. `spec.default.predictor.sklearn`
    pub field: String,
    /// Why the field was rejected
    pub reason: RejectionError,
}

impl ServiceRejection {
    pub(crate) fn at(field: impl Into<String>, reason: RejectionError) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }
}
