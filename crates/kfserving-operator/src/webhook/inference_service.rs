//! InferenceService admission webhooks
//!
//! The mutating webhook resolves every endpoint against the current registry
//! snapshot and patches the defaulted spec back in. The validating webhook
//! runs the same resolution and only allows or denies. Both fail closed: no
//! snapshot, an unparseable spec, or a rejection all deny the request.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kube::{
    api::DynamicObject,
    core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
};
use tracing::{debug, error, info, warn};

use kfserving_common::crd::InferenceServiceSpec;
use kfserving_resolver::{
    apply_defaults, resolve_inference_service, ServiceRejection, ServiceResolution,
};

use super::WebhookState;

/// Error type for webhook operations
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The admission review request was invalid or malformed
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The object's spec is not a valid InferenceService spec
    #[error("invalid InferenceService spec: {0}")]
    InvalidSpec(String),

    /// No registry snapshot has been published yet
    #[error("runtime registry not loaded yet, retry later")]
    RegistryNotLoaded,

    /// Resolution rejected the spec
    #[error(transparent)]
    Rejected(#[from] ServiceRejection),

    /// An error occurred during JSON serialization/deserialization
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidReview(_) | WebhookError::InvalidSpec(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WebhookError::RegistryNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

fn into_request(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionRequest<DynamicObject>, WebhookError> {
    let request: Result<AdmissionRequest<DynamicObject>, _> = review.try_into();
    request.map_err(|e| {
        error!(error = %e, "Failed to parse admission request");
        WebhookError::InvalidReview(e.to_string())
    })
}

/// Handle mutating admission review for InferenceServices
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let request = into_request(body)?;
    Ok(Json(mutate(&state, &request).into_review()))
}

/// Handle validating admission review for InferenceServices
pub async fn validate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    let request = into_request(body)?;
    Ok(Json(validate(&state, &request).into_review()))
}

/// Spec of the object under review, or `None` for requests without one
fn object_spec(
    request: &AdmissionRequest<DynamicObject>,
) -> Result<Option<InferenceServiceSpec>, WebhookError> {
    let Some(object) = &request.object else {
        return Ok(None);
    };
    let spec = object
        .data
        .get("spec")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    serde_json::from_value(spec)
        .map(Some)
        .map_err(|e| WebhookError::InvalidSpec(e.to_string()))
}

/// Resolve the object under review against the current snapshot
fn resolve_request(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<Option<(InferenceServiceSpec, ServiceResolution)>, WebhookError> {
    let Some(spec) = object_spec(request)? else {
        return Ok(None);
    };
    let snapshot = state
        .store
        .current()
        .ok_or(WebhookError::RegistryNotLoaded)?;
    let resolution = resolve_inference_service(&snapshot, &spec)?;
    Ok(Some((spec, resolution)))
}

fn deny(request: &AdmissionRequest<DynamicObject>, err: WebhookError) -> AdmissionResponse {
    warn!(
        uid = %request.uid,
        name = %request.name,
        namespace = ?request.namespace,
        error = %err,
        "Denying InferenceService"
    );
    AdmissionResponse::from(request).deny(err.to_string())
}

fn mutate(state: &WebhookState, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let (mut spec, resolution) = match resolve_request(state, request) {
        Ok(Some(resolved)) => resolved,
        Ok(None) => {
            debug!(uid = %request.uid, "No object in request, allowing unchanged");
            return AdmissionResponse::from(request);
        }
        Err(e) => return deny(request, e),
    };

    let original = spec.clone();
    apply_defaults(&mut spec, &resolution);
    if spec == original {
        debug!(uid = %request.uid, name = %request.name, "Spec already fully defaulted");
        return AdmissionResponse::from(request);
    }

    let patch_ops = match build_patch_operations(&spec) {
        Ok(ops) => ops,
        Err(e) => return deny(request, e.into()),
    };

    info!(
        uid = %request.uid,
        name = %request.name,
        namespace = ?request.namespace,
        predictor = %resolution.default.predictor_image,
        canary = resolution.canary.is_some(),
        "Defaulting InferenceService"
    );

    match AdmissionResponse::from(request).with_patch(json_patch::Patch(patch_ops)) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %request.uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}

fn validate(state: &WebhookState, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    match resolve_request(state, request) {
        Ok(Some(_)) => {
            debug!(uid = %request.uid, name = %request.name, "InferenceService is valid");
            AdmissionResponse::from(request)
        }
        Ok(None) => AdmissionResponse::from(request),
        Err(e) => deny(request, e),
    }
}

/// Replace the whole spec with the defaulted one
fn build_patch_operations(
    spec: &InferenceServiceSpec,
) -> Result<Vec<json_patch::PatchOperation>, serde_json::Error> {
    use json_patch::{PatchOperation, ReplaceOperation};
    use jsonptr::PointerBuf;

    Ok(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(["spec"]),
        value: serde_json::to_value(spec)?,
    })])
}
