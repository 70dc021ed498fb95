//! Custom Resource Definitions for KFServing
//!
//! This module contains the InferenceService CRD served by the controller.

mod inference_service;

pub use inference_service::{
    AlibiExplainerSpec, AlibiExplainerType, EndpointSpec, ExplainerFramework, ExplainerSpec,
    FrameworkSpec, InferenceService, InferenceServiceSpec, InferenceServiceStatus,
    PredictorFramework, PredictorSpec, PyTorchSpec, ResourceRequirements,
};
