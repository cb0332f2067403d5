use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::error;

use crate::checkpoint::CheckpointStore;
use crate::error::SchedulerError;
use crate::function::{FunctionDef, StatusEntry};
use crate::registry::Registry;

/// Shared handle to the registry, cheap to clone and safe to hand to both
/// the HTTP surface and the scheduler loop — mirroring how `cave-kernel`
/// hands out a cloneable `CaveKernel<R>` wrapping an `Arc<RwLock<_>>` to
/// every axum handler. A `tokio::sync::Mutex` is used instead of
/// `parking_lot` because the registry lock is held across the dispatch
/// queue's async `send`, which must not block the executor.
#[derive(Clone)]
pub struct SchedulerHandle {
    registry: Arc<Mutex<Registry>>,
    checkpoint: Arc<CheckpointStore>,
}

impl SchedulerHandle {
    pub fn new(registry: Registry, checkpoint: CheckpointStore) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            checkpoint: Arc::new(checkpoint),
        }
    }

    pub(crate) fn registry_arc(&self) -> Arc<Mutex<Registry>> {
        Arc::clone(&self.registry)
    }

    pub(crate) fn checkpoint_store(&self) -> Arc<CheckpointStore> {
        Arc::clone(&self.checkpoint)
    }

    pub async fn register(&self, def: FunctionDef) -> Result<(), SchedulerError> {
        let mut registry = self.registry.lock().await;
        registry.register(def)?;
        if let Err(err) = self.checkpoint.save(&registry) {
            error!(error = %err, "checkpoint write failed after register");
        }
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> bool {
        let mut registry = self.registry.lock().await;
        let existed = registry.delete(name);
        if existed {
            if let Err(err) = self.checkpoint.save(&registry) {
                error!(error = %err, "checkpoint write failed after delete");
            }
        }
        existed
    }

    pub async fn snapshot(&self) -> Vec<StatusEntry> {
        self.registry.lock().await.snapshot()
    }

    /// Forces an out-of-band checkpoint write, used on graceful shutdown so
    /// pending (not-yet-complete) events survive a restart even though the
    /// steady-state policy only checkpoints on row completion.
    pub async fn checkpoint_now(&self) -> Result<(), SchedulerError> {
        let registry = self.registry.lock().await;
        self.checkpoint.save(&registry)
    }
}
