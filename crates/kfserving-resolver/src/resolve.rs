//! Framework → image resolution against a registry snapshot

use kfserving_registry::{Registry, RegistryNamespace};

use crate::error::RejectionError;

/// What the caller asked for
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserSpec {
    /// Framework name, looked up verbatim
    pub framework: String,
    /// Requested version; `None` or empty means "use the registry default"
    pub version: Option<String>,
    /// Whether the caller requested GPU resources
    pub gpu_requested: bool,
}

impl UserSpec {
    /// Request the default version of `framework` without a GPU
    pub fn new(framework: impl Into<String>) -> Self {
        Self {
            framework: framework.into(),
            ..Default::default()
        }
    }

    /// Request a specific version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the GPU request flag
    pub fn with_gpu(mut self, gpu_requested: bool) -> Self {
        self.gpu_requested = gpu_requested;
        self
    }

    /// The requested version, if one was actually given
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

/// A validated image reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Base image, without a tag
    pub image: String,
    /// Version tag that was selected
    pub version: String,
    /// Whether the request asked for a GPU
    pub gpu: bool,
}

impl ResolvedImage {
    /// Fully qualified `image:version` reference
    pub fn reference(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for ResolvedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.image, self.version)
    }
}

/// Resolve `spec` against one registry snapshot
///
/// 1. Look up the framework in `namespace`
/// 2. Pick the version: explicit version verbatim; otherwise the GPU default
///    for GPU requests (failing if there is none), else the CPU default
/// 3. Check the version is allowed
pub fn resolve(
    registry: &Registry,
    namespace: RegistryNamespace,
    spec: &UserSpec,
) -> Result<ResolvedImage, RejectionError> {
    let descriptor = registry
        .lookup(namespace, &spec.framework)
        .map_err(|e| RejectionError::UnknownFramework {
            namespace: e.namespace,
            framework: e.framework,
        })?;

    let version = match spec.requested_version() {
        Some(version) => version,
        None if spec.gpu_requested => {
            descriptor
                .default_gpu_version()
                .ok_or_else(|| RejectionError::NoGpuVariant {
                    framework: spec.framework.clone(),
                })?
        }
        None => descriptor.default_version(),
    };

    if !descriptor.is_allowed(version) {
        return Err(RejectionError::VersionNotAllowed {
            framework: spec.framework.clone(),
            version: version.to_string(),
            allowed: descriptor.allowed_versions().to_vec(),
        });
    }

    Ok(ResolvedImage {
        image: descriptor.image().to_string(),
        version: version.to_string(),
        gpu: spec.gpu_requested,
    })
}
