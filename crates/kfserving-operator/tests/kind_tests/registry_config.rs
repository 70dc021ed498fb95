//! Integration tests for the runtime registry ConfigMap
//!
//! These tests tell the story of a platform operator publishing and changing
//! the set of serving runtimes while the webhook is running.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{sleep, timeout};

use kfserving_common::{KFSERVING_NAMESPACE, PREDICTORS_CONFIG_KEY};
use kfserving_registry::watcher::watch_config_map;
use kfserving_registry::{Registry, RegistryNamespace, RegistryStore};
use kfserving_resolver::{resolve, UserSpec};

use super::helpers::{
    apply_registry_config_map, delete_registry_config_map, ensure_test_cluster,
    seeded_registry_data,
};

/// How long to wait for the watcher to observe a change
const WATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Start a watcher on `name` and return the store it feeds
fn start_watcher(
    client: kube::Client,
    name: &str,
) -> (Arc<RegistryStore>, tokio::task::JoinHandle<()>) {
    let store = Arc::new(RegistryStore::new());
    let handle = {
        let store = store.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            watch_config_map(client, store, KFSERVING_NAMESPACE, &name).await
        })
    };
    (store, handle)
}

/// Wait until the store publishes a snapshot matching `predicate`
async fn wait_for_snapshot(
    store: &RegistryStore,
    predicate: impl Fn(&Registry) -> bool,
) -> Arc<Registry> {
    let mut snapshots = Box::pin(store.watch());
    timeout(WATCH_TIMEOUT, async {
        while let Some(snapshot) = snapshots.next().await {
            if predicate(snapshot.as_ref()) {
                return snapshot;
            }
        }
        panic!("registry store closed before a matching snapshot was published");
    })
    .await
    .expect("timed out waiting for registry snapshot")
}

fn sklearn_default(registry: &Registry) -> String {
    resolve(registry, RegistryNamespace::Predictors, &UserSpec::new("sklearn"))
        .unwrap()
        .version
}

/// Story: the platform publishes the stock registry and webhooks become ready
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_watcher_publishes_seeded_registry() {
    let client = ensure_test_cluster().await.unwrap();
    let name = "registry-publish-test";
    delete_registry_config_map(&client, name).await.unwrap();

    let (store, handle) = start_watcher(client.clone(), name);
    assert!(!store.is_ready());

    apply_registry_config_map(&client, name, seeded_registry_data())
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&store, |_| true).await;
    assert_eq!(snapshot.len(RegistryNamespace::Predictors), 6);
    assert_eq!(snapshot.len(RegistryNamespace::Explainers), 1);
    assert_eq!(sklearn_default(&snapshot), "0.1.0");
    assert!(store.is_ready());

    store.close();
    handle.abort();
    delete_registry_config_map(&client, name).await.unwrap();
}

/// Story: a broken edit is ignored and a later fix is picked up
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_invalid_update_keeps_last_good_registry() {
    let client = ensure_test_cluster().await.unwrap();
    let name = "registry-update-test";
    apply_registry_config_map(&client, name, seeded_registry_data())
        .await
        .unwrap();

    let (store, handle) = start_watcher(client.clone(), name);
    let good = wait_for_snapshot(&store, |_| true).await;

    // Default version outside the allowed set
    let mut broken = seeded_registry_data();
    broken.insert(
        PREDICTORS_CONFIG_KEY.to_string(),
        serde_json::json!({
            "sklearn": {
                "image": "kfserving/sklearnserver",
                "defaultImageVersion": "0.2.0",
                "allowedImageVersions": ["latest", "0.1.0"]
            }
        })
        .to_string(),
    );
    apply_registry_config_map(&client, name, broken).await.unwrap();
    sleep(Duration::from_secs(3)).await;
    assert!(Arc::ptr_eq(&good, &store.current().unwrap()));

    let mut fixed = seeded_registry_data();
    fixed.insert(
        PREDICTORS_CONFIG_KEY.to_string(),
        serde_json::json!({
            "sklearn": {
                "image": "kfserving/sklearnserver",
                "defaultImageVersion": "0.2.0",
                "allowedImageVersions": ["latest", "0.1.0", "0.2.0"]
            }
        })
        .to_string(),
    );
    apply_registry_config_map(&client, name, fixed).await.unwrap();

    let updated = wait_for_snapshot(&store, |r| sklearn_default(r) == "0.2.0").await;
    assert_eq!(updated.len(RegistryNamespace::Predictors), 1);
    // Snapshots taken earlier are unaffected
    assert_eq!(sklearn_default(&good), "0.1.0");

    store.close();
    handle.abort();
    delete_registry_config_map(&client, name).await.unwrap();
}

/// Story: deleting the ConfigMap does not take the registry away
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleted_config_map_keeps_registry() {
    let client = ensure_test_cluster().await.unwrap();
    let name = "registry-delete-test";
    apply_registry_config_map(&client, name, seeded_registry_data())
        .await
        .unwrap();

    let (store, handle) = start_watcher(client.clone(), name);
    let snapshot = wait_for_snapshot(&store, |_| true).await;

    delete_registry_config_map(&client, name).await.unwrap();
    sleep(Duration::from_secs(3)).await;

    assert!(store.is_ready());
    assert!(Arc::ptr_eq(&snapshot, &store.current().unwrap()));

    store.close();
    handle.abort();
}
