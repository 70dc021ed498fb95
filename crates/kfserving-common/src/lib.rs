//! Common types for KFServing: CRDs, errors, constants, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace for KFServing system resources (controller, registry config)
pub const KFSERVING_NAMESPACE: &str = "kfserving-system";

/// Name of the ConfigMap holding the runtime registry
pub const INFERENCE_SERVICE_CONFIG_MAP_NAME: &str = "inferenceservice-config";

/// ConfigMap data key for the predictor runtimes
pub const PREDICTORS_CONFIG_KEY: &str = "predictors";

/// ConfigMap data key for the explainer runtimes
pub const EXPLAINERS_CONFIG_KEY: &str = "explainers";

/// Extended resource name that marks a GPU request
pub const NVIDIA_GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "kfserving-controller";

/// Default port for the admission webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;
