//! ConfigMap watcher feeding the registry store
//!
//! Watches the `inferenceservice-config` ConfigMap and reloads the store on
//! every applied version. Invalid versions are logged and skipped so the
//! last valid registry keeps serving; deleting the ConfigMap does not clear
//! the store either.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::registry::{Registry, RegistryNamespace};
use crate::store::RegistryStore;

/// Reload `store` from a ConfigMap's data
pub fn apply_config_map(
    store: &RegistryStore,
    config_map: &ConfigMap,
) -> Result<Arc<Registry>, StoreError> {
    let name = config_map.name_any();
    let data = config_map.data.clone().unwrap_or_default();

    match store.reload_config_map(&data) {
        Ok(snapshot) if snapshot.is_empty() => {
            warn!(
                config_map = %name,
                resource_version = ?config_map.resource_version(),
                "Runtime registry reloaded with no frameworks, every request will be denied"
            );
            Ok(snapshot)
        }
        Ok(snapshot) => {
            info!(
                config_map = %name,
                resource_version = ?config_map.resource_version(),
                predictors = snapshot.len(RegistryNamespace::Predictors),
                explainers = snapshot.len(RegistryNamespace::Explainers),
                "Runtime registry reloaded"
            );
            Ok(snapshot)
        }
        Err(StoreError::Parse(e)) => {
            warn!(
                config_map = %name,
                error = %e,
                "Rejected runtime registry update, keeping previous snapshot"
            );
            Err(StoreError::Parse(e))
        }
        Err(StoreError::Closed) => {
            debug!(config_map = %name, "Registry store closed, ignoring update");
            Err(StoreError::Closed)
        }
    }
}

/// Watch the named ConfigMap and reload `store` until the store is closed
/// or the watch stream ends.
pub async fn watch_config_map(
    client: Client,
    store: Arc<RegistryStore>,
    namespace: &str,
    name: &str,
) {
    let api: Api<ConfigMap> = Api::namespaced(client, namespace);
    let config = watcher::Config::default().fields(&format!("metadata.name={name}"));

    info!(namespace = %namespace, config_map = %name, "Starting runtime registry watch");

    let stream = watcher(api, config).default_backoff();
    tokio::pin!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Apply(cm)) | Ok(watcher::Event::InitApply(cm)) => {
                if let Err(StoreError::Closed) = apply_config_map(&store, &cm) {
                    break;
                }
            }
            Ok(watcher::Event::Delete(cm)) => {
                warn!(
                    config_map = %cm.name_any(),
                    "Runtime registry ConfigMap deleted, keeping last snapshot"
                );
            }
            Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => {}
            Err(e) => {
                error!(error = %e, "Runtime registry watch error, backing off");
            }
        }

        if store.is_closed() {
            break;
        }
    }

    info!(config_map = %name, "Runtime registry watch stopped");
}
