//! Tracks the in-flight pipeline run of each asset.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::AbortHandle;
use uuid::Uuid;

#[derive(Debug)]
struct ActiveRun {
    generation: i64,
    handle: AbortHandle,
}

/// At most one run per asset is live. A run for a newer generation aborts the
/// older one; a run for an older generation is aborted on arrival.
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: Arc<DashMap<Uuid, ActiveRun>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the incoming run was already superseded.
    pub fn register(&self, asset_id: Uuid, generation: i64, handle: AbortHandle) -> bool {
        match self.runs.entry(asset_id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().generation > generation {
                    handle.abort();
                    return false;
                }
                let previous = occupied.insert(ActiveRun { generation, handle });
                if previous.generation != generation {
                    tracing::debug!(
                        asset_id = %asset_id,
                        previous_generation = previous.generation,
                        generation,
                        "Superseding in-flight run"
                    );
                }
                previous.handle.abort();
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ActiveRun { generation, handle });
                true
            }
        }
    }

    /// Drop the entry for a run that completed on its own.
    pub fn finish(&self, asset_id: Uuid, generation: i64) {
        self.runs
            .remove_if(&asset_id, |_, run| run.generation == generation);
    }

    /// Abort whatever run is live for the asset. Returns whether one was found.
    pub fn cancel(&self, asset_id: Uuid) -> bool {
        match self.runs.remove(&asset_id) {
            Some((_, run)) => {
                run.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, asset_id: Uuid) -> bool {
        self.runs.contains_key(&asset_id)
    }

    pub fn active_count(&self) -> usize {
        self.runs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pending_task() -> tokio::task::JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
    }

    #[tokio::test]
    async fn test_newer_generation_aborts_older() {
        let registry = RunRegistry::new();
        let id = Uuid::new_v4();
        let first = pending_task();
        let second = pending_task();

        assert!(registry.register(id, 1, first.abort_handle()));
        assert!(registry.register(id, 2, second.abort_handle()));

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(registry.active_count(), 1);
        second.abort();
    }

    #[tokio::test]
    async fn test_older_generation_rejected() {
        let registry = RunRegistry::new();
        let id = Uuid::new_v4();
        let current = pending_task();
        let late = pending_task();

        assert!(registry.register(id, 3, current.abort_handle()));
        assert!(!registry.register(id, 2, late.abort_handle()));

        assert!(late.await.unwrap_err().is_cancelled());
        assert!(registry.is_running(id));
        current.abort();
    }

    #[tokio::test]
    async fn test_finish_ignores_other_generation() {
        let registry = RunRegistry::new();
        let id = Uuid::new_v4();
        let task = pending_task();
        registry.register(id, 2, task.abort_handle());

        registry.finish(id, 1);
        assert!(registry.is_running(id));
        registry.finish(id, 2);
        assert!(!registry.is_running(id));
        task.abort();
    }

    #[tokio::test]
    async fn test_cancel_aborts() {
        let registry = RunRegistry::new();
        let id = Uuid::new_v4();
        let task = pending_task();
        registry.register(id, 1, task.abort_handle());

        assert!(registry.cancel(id));
        assert!(!registry.cancel(id));
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
