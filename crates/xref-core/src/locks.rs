//! Per-artifact write locks
//!
//! Writes to the same artifact are totally ordered; writes to different
//! artifacts proceed independently. Lock entries are removed once no task
//! holds or waits on them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use xref_artifact::ArtifactId;

/// Lock table keyed by artifact identity
#[derive(Debug, Default)]
pub struct ArtifactLocks {
    locks: DashMap<ArtifactId, Arc<Mutex<()>>>,
}

impl ArtifactLocks {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn lock(&self, id: &ArtifactId) -> ArtifactGuard<'_> {
        let mutex = Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = mutex.lock_owned().await;
        ArtifactGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of live lock entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// No live lock entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one artifact, released on drop
#[derive(Debug)]
pub struct ArtifactGuard<'a> {
    locks: &'a ArtifactLocks,
    id: ArtifactId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ArtifactGuard<'_> {
    /// Locked artifact
    #[must_use]
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }
}

impl Drop for ArtifactGuard<'_> {
    fn drop(&mut self) {
        // release first so the table holds the last reference when unused
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
