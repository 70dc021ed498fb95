//! Integration tests for InferenceService CRD operations
//!
//! These tests tell the story of users submitting model services through the
//! Kubernetes API.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};

use kfserving_common::crd::{
    EndpointSpec, FrameworkSpec, InferenceService, InferenceServiceSpec, PredictorSpec,
    PyTorchSpec, ResourceRequirements,
};
use kfserving_common::{KFSERVING_NAMESPACE, NVIDIA_GPU_RESOURCE};
use kfserving_registry::Registry;
use kfserving_resolver::{apply_defaults, resolve_inference_service};

use super::helpers::{ensure_test_cluster, seeded_registry_data};

// =============================================================================
// Test Fixtures
// =============================================================================

fn sklearn_service(name: &str) -> InferenceService {
    InferenceService::new(
        name,
        InferenceServiceSpec {
            default: EndpointSpec {
                predictor: PredictorSpec {
                    sklearn: Some(FrameworkSpec {
                        storage_uri: "gs://kfserving-samples/models/sklearn/iris".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                explainer: None,
            },
            canary: None,
        },
    )
}

fn pytorch_gpu_service(name: &str) -> InferenceService {
    InferenceService {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                "app.kubernetes.io/part-of".to_string(),
                "kfserving-integration-test".to_string(),
            )])),
            ..Default::default()
        },
        spec: InferenceServiceSpec {
            default: EndpointSpec {
                predictor: PredictorSpec {
                    pytorch: Some(PyTorchSpec {
                        framework: FrameworkSpec {
                            storage_uri: "gs://kfserving-samples/models/pytorch/cifar10"
                                .to_string(),
                            resources: Some(ResourceRequirements {
                                limits: BTreeMap::from([(
                                    NVIDIA_GPU_RESOURCE.to_string(),
                                    "1".to_string(),
                                )]),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        model_class_name: Some("Net".to_string()),
                    }),
                    ..Default::default()
                },
                explainer: None,
            },
            canary: None,
        },
        status: None,
    }
}

// =============================================================================
// Stories
// =============================================================================

/// Story: a user creates a minimal InferenceService and reads it back
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_create_and_read_inference_service() {
    let client = ensure_test_cluster().await.unwrap();
    let api: Api<InferenceService> = Api::namespaced(client, KFSERVING_NAMESPACE);
    let name = "sklearn-iris";

    let _ = api.delete(name, &DeleteParams::default()).await;

    let created = api
        .create(&PostParams::default(), &sklearn_service(name))
        .await
        .unwrap();
    assert_eq!(created.metadata.name.as_deref(), Some(name));

    let fetched = api.get(name).await.unwrap();
    assert_eq!(fetched.spec, sklearn_service(name).spec);

    api.delete(name, &DeleteParams::default()).await.unwrap();
}

/// Story: a defaulted spec is accepted by the API server unchanged
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_defaulted_spec_round_trips_through_api_server() {
    let client = ensure_test_cluster().await.unwrap();
    let api: Api<InferenceService> = Api::namespaced(client, KFSERVING_NAMESPACE);
    let name = "pytorch-cifar10";

    let registry = Registry::from_config_map_data(&seeded_registry_data()).unwrap();
    let mut service = pytorch_gpu_service(name);
    let resolution = resolve_inference_service(&registry, &service.spec).unwrap();
    assert_eq!(
        resolution.default.predictor_image.reference(),
        "kfserving/pytorchserver:0.1.0-gpu"
    );
    apply_defaults(&mut service.spec, &resolution);

    let _ = api.delete(name, &DeleteParams::default()).await;
    api.create(&PostParams::default(), &service).await.unwrap();

    let fetched = api.get(name).await.unwrap();
    assert_eq!(fetched.spec, service.spec);
    let pytorch = fetched.spec.default.predictor.pytorch.unwrap();
    assert_eq!(
        pytorch.framework.runtime_version.as_deref(),
        Some("0.1.0-gpu")
    );

    api.delete(name, &DeleteParams::default()).await.unwrap();
}
