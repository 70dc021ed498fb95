//! Published registry snapshots
//!
//! The store owns the single authoritative `Arc<Registry>`. Reloads validate
//! a complete new registry first and only then swap the reference, so
//! readers always see one coherent registry and never a mix of two.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::registry::{Registry, RegistryNamespace};

type Snapshot = Option<Arc<Registry>>;

/// Holder of the current registry snapshot
pub struct RegistryStore {
    /// `None` once the store is closed
    sender: Mutex<Option<watch::Sender<Snapshot>>>,
    receiver: watch::Receiver<Snapshot>,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore {
    /// Create a store with no snapshot published yet
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Create a store with an initial snapshot
    pub fn with_registry(registry: Registry) -> Self {
        let (sender, receiver) = watch::channel(Some(Arc::new(registry)));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Current snapshot, if one has been published
    ///
    /// Keeps returning the last valid snapshot after the store is closed.
    pub fn current(&self) -> Option<Arc<Registry>> {
        self.receiver.borrow().clone()
    }

    /// Whether a snapshot has been published
    pub fn is_ready(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Replace the current snapshot; the last writer wins
    pub fn publish(&self, registry: Registry) -> Result<Arc<Registry>, StoreError> {
        let snapshot = Arc::new(registry);
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(StoreError::Closed)?;
        sender.send_replace(Some(Arc::clone(&snapshot)));
        debug!(
            predictors = snapshot.len(RegistryNamespace::Predictors),
            explainers = snapshot.len(RegistryNamespace::Explainers),
            "Published registry snapshot"
        );
        Ok(snapshot)
    }

    /// Validate a combined payload and publish it
    ///
    /// On error nothing is published and the previous snapshot stays current.
    pub fn reload(&self, raw: &[u8]) -> Result<Arc<Registry>, StoreError> {
        let registry = Registry::load(raw)?;
        self.publish(registry)
    }

    /// Validate ConfigMap data and publish it
    ///
    /// On error nothing is published and the previous snapshot stays current.
    pub fn reload_config_map(
        &self,
        data: &BTreeMap<String, String>,
    ) -> Result<Arc<Registry>, StoreError> {
        let registry = Registry::from_config_map_data(data)?;
        self.publish(registry)
    }

    /// Stream of snapshots: the current one (if any), then the latest after
    /// each publish. Ends once the store is closed.
    pub fn watch(&self) -> impl Stream<Item = Arc<Registry>> + Send + 'static {
        WatchStream::new(self.receiver.clone()).filter_map(futures::future::ready)
    }

    /// Stop publishing; open watch streams end
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            info!("Registry store closed");
        }
    }

    /// Whether [`RegistryStore::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}
