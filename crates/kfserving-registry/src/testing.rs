//! Shared registry fixtures for tests
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for downstream crates and the kind suite. The data is the
//! registry a stock controller test bootstrap installs.

use std::collections::BTreeMap;

use kfserving_common::{EXPLAINERS_CONFIG_KEY, PREDICTORS_CONFIG_KEY};

use crate::registry::Registry;

/// `predictors` value of the seeded ConfigMap
pub const SEEDED_PREDICTORS: &str = r#"{
    "tensorflow": {
        "image": "tensorflow/serving",
        "defaultImageVersion": "latest",
        "defaultGPUImageVersion": "latest-gpu",
        "allowedImageVersions": ["latest", "latest-gpu"]
    },
    "sklearn": {
        "image": "kfserving/sklearnserver",
        "defaultImageVersion": "0.1.0",
        "allowedImageVersions": ["latest", "0.1.0"]
    },
    "xgboost": {
        "image": "kfserving/xgbserver",
        "defaultImageVersion": "0.1.0",
        "allowedImageVersions": ["latest", "0.1.0"]
    },
    "pytorch": {
        "image": "kfserving/pytorchserver",
        "defaultImageVersion": "0.1.0",
        "defaultGPUImageVersion": "0.1.0-gpu",
        "allowedImageVersions": ["latest", "0.1.0", "0.1.0-gpu"]
    },
    "onnx": {
        "image": "onnxruntime/server",
        "defaultImageVersion": "v0.5.0",
        "allowedImageVersions": ["latest", "v0.5.0"]
    },
    "tensorrt": {
        "image": "nvcr.io/nvidia/tensorrtserver",
        "defaultImageVersion": "19.05-py3",
        "allowedImageVersions": ["19.05-py3"]
    }
}"#;

/// `explainers` value of the seeded ConfigMap
pub const SEEDED_EXPLAINERS: &str = r#"{
    "alibi": {
        "image": "docker.io/seldonio/alibiexplainer",
        "defaultImageVersion": "0.2.3",
        "allowedImageVersions": ["0.2.3"]
    }
}"#;

/// Data of the seeded `inferenceservice-config` ConfigMap
pub fn seeded_config_map_data() -> BTreeMap<String, String> {
    BTreeMap::from([
        (PREDICTORS_CONFIG_KEY.to_string(), SEEDED_PREDICTORS.to_string()),
        (EXPLAINERS_CONFIG_KEY.to_string(), SEEDED_EXPLAINERS.to_string()),
    ])
}

/// Seeded data with `framework` removed from the predictors namespace
pub fn seeded_config_map_data_without(framework: &str) -> BTreeMap<String, String> {
    let mut predictors: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(SEEDED_PREDICTORS).unwrap_or_default();
    predictors.remove(framework);

    let mut data = seeded_config_map_data();
    data.insert(
        PREDICTORS_CONFIG_KEY.to_string(),
        serde_json::Value::Object(predictors).to_string(),
    );
    data
}

/// The seeded registry, parsed
///
/// # Panics
///
/// Panics if the seeded data stops parsing, which is a broken fixture.
pub fn seeded_registry() -> Registry {
    Registry::from_config_map_data(&seeded_config_map_data())
        .expect("seeded registry fixture must parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryNamespace;

    #[test]
    fn removing_a_framework_keeps_the_rest() {
        let registry = Registry::from_config_map_data(&seeded_config_map_data_without("onnx"))
            .unwrap();
        assert!(registry.lookup(RegistryNamespace::Predictors, "onnx").is_err());
        assert_eq!(registry.len(RegistryNamespace::Predictors), 5);
        assert_eq!(registry.len(RegistryNamespace::Explainers), 1);
    }
}
