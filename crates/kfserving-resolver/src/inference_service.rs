//! InferenceService defaulting and validation
//!
//! Derives a [`UserSpec`] from each endpoint's predictor and explainer,
//! resolves it against a snapshot, and writes the chosen versions back.

use tracing::debug;

use kfserving_common::crd::{
    AlibiExplainerSpec, EndpointSpec, ExplainerFramework, FrameworkSpec, InferenceServiceSpec,
    PredictorFramework, PredictorSpec, ResourceRequirements,
};
use kfserving_common::NVIDIA_GPU_RESOURCE;
use kfserving_registry::{Registry, RegistryNamespace};

use crate::error::{RejectionError, ServiceRejection};
use crate::resolve::{resolve, ResolvedImage, UserSpec};

/// CPU request/limit applied when a container sets none
pub const DEFAULT_CPU: &str = "1";

/// Memory request/limit applied when a container sets none
pub const DEFAULT_MEMORY: &str = "2Gi";

/// Storage URI schemes the storage initializer can fetch from
const SUPPORTED_STORAGE_SCHEMES: &[&str] = &["gs://", "s3://", "pvc://", "file://"];

/// Host suffix of Azure blob storage, the only supported `https://` source
const AZURE_BLOB_HOST_SUFFIX: &str = ".blob.core.windows.net";

/// Resolved images for one endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointResolution {
    /// The predictor framework that was set
    pub predictor: PredictorFramework,
    /// Image for the predictor
    pub predictor_image: ResolvedImage,
    /// Image for the explainer, if the endpoint has one
    pub explainer_image: Option<ResolvedImage>,
}

/// Resolved images for every endpoint of an InferenceService
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceResolution {
    /// The `default` endpoint
    pub default: EndpointResolution,
    /// The `canary` endpoint, when present
    pub canary: Option<EndpointResolution>,
}

/// Whether `resources` asks for an NVIDIA GPU
pub fn gpu_requested(resources: Option<&ResourceRequirements>) -> bool {
    resources
        .map(|r| r.limits.contains_key(NVIDIA_GPU_RESOURCE))
        .unwrap_or(false)
}

/// Check a model location is one the storage initializer understands
pub fn validate_storage_uri(uri: &str) -> Result<(), RejectionError> {
    let invalid = || RejectionError::InvalidStorageUri {
        uri: uri.to_string(),
    };

    if uri.is_empty() {
        return Err(invalid());
    }
    if SUPPORTED_STORAGE_SCHEMES
        .iter()
        .any(|scheme| uri.starts_with(scheme))
    {
        return Ok(());
    }
    if let Some(rest) = uri.strip_prefix("https://") {
        let host = rest.split('/').next().unwrap_or_default();
        let account = host.strip_suffix(AZURE_BLOB_HOST_SUFFIX).unwrap_or_default();
        if !account.is_empty() && rest.len() > host.len() + 1 {
            return Ok(());
        }
        return Err(invalid());
    }
    // Anything without a scheme is a path on the local filesystem
    if !uri.contains("://") {
        return Ok(());
    }
    Err(invalid())
}

/// The single predictor framework set on `predictor`
pub fn predictor_framework(predictor: &PredictorSpec) -> Result<PredictorFramework, RejectionError> {
    match predictor.specified_frameworks().as_slice() {
        [] => Err(RejectionError::NoPredictor),
        [framework] => Ok(*framework),
        many => Err(RejectionError::MultiplePredictors {
            frameworks: many.iter().map(|f| f.as_str().to_string()).collect(),
        }),
    }
}

/// Check `predictor` sets exactly one framework with a usable storage URI
///
/// Returns the framework and its settings; rejections are located under
/// `field`, the predictor's path.
pub fn validate_predictor<'a>(
    field: &str,
    predictor: &'a PredictorSpec,
) -> Result<(PredictorFramework, &'a FrameworkSpec), ServiceRejection> {
    let framework = predictor_framework(predictor).map_err(|e| ServiceRejection::at(field, e))?;
    let spec = predictor
        .framework(framework)
        .ok_or_else(|| ServiceRejection::at(field, RejectionError::NoPredictor))?;

    validate_storage_uri(&spec.storage_uri)
        .map_err(|e| ServiceRejection::at(format!("{field}.{framework}.storageUri"), e))?;

    Ok((framework, spec))
}

fn framework_user_spec(framework: &str, spec: &FrameworkSpec) -> UserSpec {
    UserSpec {
        framework: framework.to_string(),
        version: spec.runtime_version.clone(),
        gpu_requested: gpu_requested(spec.resources.as_ref()),
    }
}

fn alibi_user_spec(spec: &AlibiExplainerSpec) -> UserSpec {
    UserSpec {
        framework: ExplainerFramework::Alibi.as_str().to_string(),
        version: spec.runtime_version.clone(),
        gpu_requested: gpu_requested(spec.resources.as_ref()),
    }
}

/// Validate and resolve one endpoint
///
/// `field` is the endpoint's path (e.g. `spec.default`) and prefixes any
/// rejection.
pub fn resolve_endpoint(
    registry: &Registry,
    field: &str,
    endpoint: &EndpointSpec,
) -> Result<EndpointResolution, ServiceRejection> {
    let predictor_field = format!("{field}.predictor");
    let (framework, spec) = validate_predictor(&predictor_field, &endpoint.predictor)?;
    let framework_field = format!("{predictor_field}.{framework}");

    let predictor_image = resolve(
        registry,
        RegistryNamespace::Predictors,
        &framework_user_spec(framework.as_str(), spec),
    )
    .map_err(|e| ServiceRejection::at(&framework_field, e))?;

    let explainer_image = match &endpoint.explainer {
        None => None,
        Some(explainer) => {
            let explainer_field = format!("{field}.explainer");
            let alibi = explainer.alibi.as_ref().ok_or_else(|| {
                ServiceRejection::at(&explainer_field, RejectionError::NoExplainer)
            })?;
            let alibi_field = format!("{explainer_field}.{}", ExplainerFramework::Alibi);

            if let Some(uri) = &alibi.storage_uri {
                validate_storage_uri(uri)
                    .map_err(|e| ServiceRejection::at(format!("{alibi_field}.storageUri"), e))?;
            }

            let image = resolve(
                registry,
                RegistryNamespace::Explainers,
                &alibi_user_spec(alibi),
            )
            .map_err(|e| ServiceRejection::at(&alibi_field, e))?;
            Some(image)
        }
    };

    debug!(
        endpoint = %field,
        predictor = %predictor_image,
        explainer = ?explainer_image.as_ref().map(ResolvedImage::reference),
        "Resolved endpoint images"
    );

    Ok(EndpointResolution {
        predictor: framework,
        predictor_image,
        explainer_image,
    })
}

/// Validate and resolve the `default` and `canary` endpoints
///
/// The first rejection decides the outcome; nothing partial is returned.
pub fn resolve_inference_service(
    registry: &Registry,
    spec: &InferenceServiceSpec,
) -> Result<ServiceResolution, ServiceRejection> {
    let default = resolve_endpoint(registry, "spec.default", &spec.default)?;
    let canary = spec
        .canary
        .as_ref()
        .map(|canary| resolve_endpoint(registry, "spec.canary", canary))
        .transpose()?;
    Ok(ServiceResolution { default, canary })
}

/// Write resolved versions and default resources back into `spec`
pub fn apply_defaults(spec: &mut InferenceServiceSpec, resolution: &ServiceResolution) {
    apply_endpoint_defaults(&mut spec.default, &resolution.default);
    if let (Some(canary), Some(resolved)) = (spec.canary.as_mut(), resolution.canary.as_ref()) {
        apply_endpoint_defaults(canary, resolved);
    }
}

fn apply_endpoint_defaults(endpoint: &mut EndpointSpec, resolution: &EndpointResolution) {
    if let Some(framework) = endpoint.predictor.framework_mut(resolution.predictor) {
        framework.runtime_version = Some(resolution.predictor_image.version.clone());
        default_resources(&mut framework.resources);
    }

    let alibi = endpoint
        .explainer
        .as_mut()
        .and_then(|explainer| explainer.alibi.as_mut());
    if let (Some(alibi), Some(image)) = (alibi, resolution.explainer_image.as_ref()) {
        alibi.runtime_version = Some(image.version.clone());
        default_resources(&mut alibi.resources);
    }
}

fn default_resources(resources: &mut Option<ResourceRequirements>) {
    let resources = resources.get_or_insert_with(ResourceRequirements::default);
    for quantities in [&mut resources.requests, &mut resources.limits] {
        quantities
            .entry("cpu".to_string())
            .or_insert_with(|| DEFAULT_CPU.to_string());
        quantities
            .entry("memory".to_string())
            .or_insert_with(|| DEFAULT_MEMORY.to_string());
    }
}
