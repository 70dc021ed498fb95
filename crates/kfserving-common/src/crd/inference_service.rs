//! InferenceService CRD types
//!
//! Defines `InferenceService`, a model serving workload with a `default`
//! endpoint and an optional `canary` endpoint. Each endpoint names exactly
//! one predictor framework and optionally an explainer.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Frameworks
// =============================================================================

/// Predictor frameworks known to the CRD schema.
///
/// The string form is the key used in the `predictors` registry namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredictorFramework {
    /// TensorFlow Serving
    Tensorflow,
    /// scikit-learn server
    Sklearn,
    /// XGBoost server
    Xgboost,
    /// PyTorch server
    Pytorch,
    /// ONNX Runtime server
    Onnx,
    /// NVIDIA TensorRT Inference Server
    Tensorrt,
}

impl PredictorFramework {
    /// All predictor frameworks, in schema order
    pub const ALL: [PredictorFramework; 6] = [
        Self::Tensorflow,
        Self::Sklearn,
        Self::Xgboost,
        Self::Pytorch,
        Self::Onnx,
        Self::Tensorrt,
    ];

    /// Registry key for this framework
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tensorflow => "tensorflow",
            Self::Sklearn => "sklearn",
            Self::Xgboost => "xgboost",
            Self::Pytorch => "pytorch",
            Self::Onnx => "onnx",
            Self::Tensorrt => "tensorrt",
        }
    }
}

impl std::fmt::Display for PredictorFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explainer frameworks known to the CRD schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExplainerFramework {
    /// Seldon Alibi explainer
    Alibi,
}

impl ExplainerFramework {
    /// Registry key for this framework
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alibi => "alibi",
        }
    }
}

impl std::fmt::Display for ExplainerFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Container resource requests and limits
///
/// Keys are resource names (`cpu`, `memory`, `nvidia.com/gpu`), values are
/// Kubernetes quantities.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceRequirements {
    /// Resource requests
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,

    /// Resource limits
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

// =============================================================================
// Predictor
// =============================================================================

/// Settings shared by every predictor framework
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSpec {
    /// Location of the trained model
    pub storage_uri: String,

    /// Runtime version tag; defaulted from the runtime registry when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Container resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// PyTorch predictor settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PyTorchSpec {
    /// Shared framework settings
    #[serde(flatten)]
    pub framework: FrameworkSpec,

    /// Python class name of the model (defaults to `PyTorchModel` in the server)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_class_name: Option<String>,
}

/// Predictor for an endpoint; exactly one framework should be set
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictorSpec {
    /// TensorFlow Serving predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensorflow: Option<FrameworkSpec>,

    /// scikit-learn predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sklearn: Option<FrameworkSpec>,

    /// XGBoost predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xgboost: Option<FrameworkSpec>,

    /// PyTorch predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pytorch: Option<PyTorchSpec>,

    /// ONNX Runtime predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onnx: Option<FrameworkSpec>,

    /// TensorRT Inference Server predictor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensorrt: Option<FrameworkSpec>,

    /// Service account for the predictor pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

impl PredictorSpec {
    /// Framework settings for the given predictor framework, if set
    pub fn framework(&self, framework: PredictorFramework) -> Option<&FrameworkSpec> {
        match framework {
            PredictorFramework::Tensorflow => self.tensorflow.as_ref(),
            PredictorFramework::Sklearn => self.sklearn.as_ref(),
            PredictorFramework::Xgboost => self.xgboost.as_ref(),
            PredictorFramework::Pytorch => self.pytorch.as_ref().map(|p| &p.framework),
            PredictorFramework::Onnx => self.onnx.as_ref(),
            PredictorFramework::Tensorrt => self.tensorrt.as_ref(),
        }
    }

    /// Mutable framework settings for the given predictor framework, if set
    pub fn framework_mut(&mut self, framework: PredictorFramework) -> Option<&mut FrameworkSpec> {
        match framework {
            PredictorFramework::Tensorflow => self.tensorflow.as_mut(),
            PredictorFramework::Sklearn => self.sklearn.as_mut(),
            PredictorFramework::Xgboost => self.xgboost.as_mut(),
            PredictorFramework::Pytorch => self.pytorch.as_mut().map(|p| &mut p.framework),
            PredictorFramework::Onnx => self.onnx.as_mut(),
            PredictorFramework::Tensorrt => self.tensorrt.as_mut(),
        }
    }

    /// Every framework that is set on this predictor, in schema order
    pub fn specified_frameworks(&self) -> Vec<PredictorFramework> {
        PredictorFramework::ALL
            .into_iter()
            .filter(|f| self.framework(*f).is_some())
            .collect()
    }
}

// =============================================================================
// Explainer
// =============================================================================

/// Alibi explanation algorithm
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AlibiExplainerType {
    /// Anchors for tabular data
    AnchorTabular,
    /// Anchors for images
    AnchorImages,
    /// Anchors for text
    AnchorText,
}

/// Alibi explainer settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlibiExplainerSpec {
    /// Explanation algorithm
    #[serde(rename = "type")]
    pub type_: AlibiExplainerType,

    /// Location of a pre-trained explainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,

    /// Runtime version tag; defaulted from the runtime registry when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Container resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Free-form explainer arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

/// Explainer for an endpoint
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplainerSpec {
    /// Alibi explainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alibi: Option<AlibiExplainerSpec>,
}

// =============================================================================
// CRD
// =============================================================================

/// A single serving endpoint: predictor plus optional explainer
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSpec {
    /// Model predictor
    pub predictor: PredictorSpec,

    /// Explainability sidecar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainer: Option<ExplainerSpec>,
}

/// Desired state of an InferenceService
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "serving.kubeflow.org",
    version = "v1alpha2",
    kind = "InferenceService",
    plural = "inferenceservices",
    shortname = "isvc",
    namespaced,
    status = "InferenceServiceStatus",
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.url"}"#,
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceSpec {
    /// Endpoint receiving traffic by default
    pub default: EndpointSpec,

    /// Optional canary endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<EndpointSpec>,
}

/// Status of an InferenceService
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceServiceStatus {
    /// Externally reachable URL of the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Whether the default endpoint is serving
    #[serde(default)]
    pub ready: bool,

    /// Human-readable message about current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
