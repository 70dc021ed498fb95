//! Registry payload parsing and lookup
//!
//! The payload has two namespaces, each a JSON object keyed by framework:
//!
//! ```json
//! {
//!   "predictors": {
//!     "sklearn": {
//!       "image": "kfserving/sklearnserver",
//!       "defaultImageVersion": "0.1.0",
//!       "allowedImageVersions": ["latest", "0.1.0"]
//!     }
//!   },
//!   "explainers": {}
//! }
//! ```
//!
//! In the ConfigMap form each namespace is its own data key.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use kfserving_common::{EXPLAINERS_CONFIG_KEY, PREDICTORS_CONFIG_KEY};

use crate::error::{EntryDefect, NotFound, ParseError};

/// Independent framework namespaces within the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistryNamespace {
    /// Primary serving frameworks
    Predictors,
    /// Explainability runtimes
    Explainers,
}

impl RegistryNamespace {
    /// Both namespaces, in payload order
    pub const ALL: [RegistryNamespace; 2] = [Self::Predictors, Self::Explainers];

    /// Payload / ConfigMap key for this namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predictors => PREDICTORS_CONFIG_KEY,
            Self::Explainers => EXPLAINERS_CONFIG_KEY,
        }
    }
}

impl std::fmt::Display for RegistryNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Images and versions registered for one framework
///
/// Only constructible through validation, so every descriptor satisfies:
/// non-empty image and default, non-empty allowed list, and both defaults
/// members of the allowed list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    image: String,
    default_version: String,
    default_gpu_version: Option<String>,
    allowed_versions: Vec<String>,
}

impl RuntimeDescriptor {
    /// Validate and build a descriptor
    ///
    /// An empty `default_gpu_version` is treated as absent.
    pub fn new(
        image: impl Into<String>,
        default_version: impl Into<String>,
        default_gpu_version: Option<String>,
        allowed_versions: Vec<String>,
    ) -> Result<Self, EntryDefect> {
        let image = image.into();
        let default_version = default_version.into();
        let default_gpu_version = default_gpu_version.filter(|v| !v.is_empty());

        if image.is_empty() {
            return Err(EntryDefect::MissingImage);
        }
        if default_version.is_empty() {
            return Err(EntryDefect::MissingDefaultVersion);
        }
        if allowed_versions.is_empty() {
            return Err(EntryDefect::EmptyAllowedVersions);
        }
        if !allowed_versions.contains(&default_version) {
            return Err(EntryDefect::DefaultNotAllowed(default_version));
        }
        if let Some(gpu) = &default_gpu_version {
            if !allowed_versions.contains(gpu) {
                return Err(EntryDefect::GpuDefaultNotAllowed(gpu.clone()));
            }
        }

        Ok(Self {
            image,
            default_version,
            default_gpu_version,
            allowed_versions,
        })
    }

    /// Base image reference, without a tag
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Version used when the caller omits one
    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Version used when the caller omits one and requests a GPU
    pub fn default_gpu_version(&self) -> Option<&str> {
        self.default_gpu_version.as_deref()
    }

    /// Permitted versions, in registry order
    pub fn allowed_versions(&self) -> &[String] {
        &self.allowed_versions
    }

    /// Whether `version` may be used
    pub fn is_allowed(&self, version: &str) -> bool {
        self.allowed_versions.iter().any(|v| v == version)
    }
}

/// Wire form of one entry; every field defaults so missing fields surface
/// as [`EntryDefect`]s instead of generic parser errors.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeEntry {
    #[serde(default)]
    image: String,
    #[serde(default)]
    default_image_version: String,
    #[serde(default, rename = "defaultGPUImageVersion")]
    default_gpu_image_version: Option<String>,
    #[serde(default)]
    allowed_image_versions: Vec<String>,
}

/// Wire form of one namespace, in payload order
///
/// Repeated framework keys are kept rather than collapsed so validation can
/// reject them.
#[derive(Debug)]
struct NamespaceEntries(Vec<(String, RuntimeEntry)>);

impl<'de> Deserialize<'de> for NamespaceEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = NamespaceEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by framework name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, RuntimeEntry>()? {
                    entries.push(entry);
                }
                Ok(NamespaceEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Wire form of the combined payload
#[derive(Debug, Deserialize)]
struct RegistryPayload {
    predictors: Option<NamespaceEntries>,
    explainers: Option<NamespaceEntries>,
}

// =============================================================================
// Registry
// =============================================================================

/// Validated registry: framework name → descriptor, per namespace
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    predictors: BTreeMap<String, RuntimeDescriptor>,
    explainers: BTreeMap<String, RuntimeDescriptor>,
}

impl Registry {
    /// Parse a combined payload with top-level `predictors` and `explainers`
    pub fn load(raw: &[u8]) -> Result<Self, ParseError> {
        let payload: RegistryPayload =
            serde_json::from_slice(raw).map_err(|e| ParseError::Malformed {
                namespace: None,
                message: e.to_string(),
            })?;

        let predictors = payload
            .predictors
            .ok_or(ParseError::MissingNamespace(RegistryNamespace::Predictors))?;
        let explainers = payload
            .explainers
            .ok_or(ParseError::MissingNamespace(RegistryNamespace::Explainers))?;

        Ok(Self {
            predictors: validate_namespace(RegistryNamespace::Predictors, predictors)?,
            explainers: validate_namespace(RegistryNamespace::Explainers, explainers)?,
        })
    }

    /// Parse the ConfigMap form, where each namespace is its own data key
    pub fn from_config_map_data(data: &BTreeMap<String, String>) -> Result<Self, ParseError> {
        let mut registry = Self::default();
        for namespace in RegistryNamespace::ALL {
            let raw = data
                .get(namespace.as_str())
                .ok_or(ParseError::MissingNamespace(namespace))?;
            let entries: NamespaceEntries =
                serde_json::from_str(raw).map_err(|e| ParseError::Malformed {
                    namespace: Some(namespace),
                    message: e.to_string(),
                })?;
            *registry.namespace_mut(namespace) = validate_namespace(namespace, entries)?;
        }
        Ok(registry)
    }

    /// Exact, case-sensitive lookup of `framework` within `namespace`
    pub fn lookup(
        &self,
        namespace: RegistryNamespace,
        framework: &str,
    ) -> Result<&RuntimeDescriptor, NotFound> {
        self.namespace(namespace)
            .get(framework)
            .ok_or_else(|| NotFound {
                namespace,
                framework: framework.to_string(),
            })
    }

    /// Registered framework names in `namespace`, sorted
    pub fn frameworks(&self, namespace: RegistryNamespace) -> impl Iterator<Item = &str> {
        self.namespace(namespace).keys().map(String::as_str)
    }

    /// Number of registered frameworks in `namespace`
    pub fn len(&self, namespace: RegistryNamespace) -> usize {
        self.namespace(namespace).len()
    }

    /// Whether both namespaces are empty
    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty() && self.explainers.is_empty()
    }

    fn namespace(&self, namespace: RegistryNamespace) -> &BTreeMap<String, RuntimeDescriptor> {
        match namespace {
            RegistryNamespace::Predictors => &self.predictors,
            RegistryNamespace::Explainers => &self.explainers,
        }
    }

    fn namespace_mut(
        &mut self,
        namespace: RegistryNamespace,
    ) -> &mut BTreeMap<String, RuntimeDescriptor> {
        match namespace {
            RegistryNamespace::Predictors => &mut self.predictors,
            RegistryNamespace::Explainers => &mut self.explainers,
        }
    }
}

/// Validate every entry of a namespace; the first defect fails the whole namespace
fn validate_namespace(
    namespace: RegistryNamespace,
    entries: NamespaceEntries,
) -> Result<BTreeMap<String, RuntimeDescriptor>, ParseError> {
    let mut validated = BTreeMap::new();
    for (framework, entry) in entries.0 {
        let invalid = |defect| ParseError::InvalidEntry {
            namespace,
            framework: framework.clone(),
            defect,
        };
        if validated.contains_key(&framework) {
            return Err(invalid(EntryDefect::Duplicate));
        }
        let descriptor = RuntimeDescriptor::new(
            entry.image,
            entry.default_image_version,
            entry.default_gpu_image_version,
            entry.allowed_image_versions,
        )
        .map_err(invalid)?;
        validated.insert(framework, descriptor);
    }
    Ok(validated)
}

// =============================================================================
// Tests
// =============================================================================
