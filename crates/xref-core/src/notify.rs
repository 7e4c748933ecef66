//! Index-dirty notifications
//!
//! The coordinator tells the host's search indexer which artifacts need their
//! derived state recomputed. Delivery happens after the write commits.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;
use tokio::sync::mpsc;
use xref_artifact::ArtifactId;

/// Receiver of index-dirty notifications
#[async_trait]
pub trait IndexNotifier: Send + Sync + Debug {
    /// `id` must be re-indexed (or removed from the index if deleted)
    async fn emit_index_dirty(&self, id: &ArtifactId);
}

/// Discards notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl IndexNotifier for NoopNotifier {
    async fn emit_index_dirty(&self, _id: &ArtifactId) {}
}

/// Forwards notifications to an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ArtifactId>,
}

impl ChannelNotifier {
    /// Create notifier and the receiving end
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ArtifactId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl IndexNotifier for ChannelNotifier {
    async fn emit_index_dirty(&self, id: &ArtifactId) {
        if self.tx.send(id.clone()).is_err() {
            tracing::debug!(artifact = %id, "index-dirty receiver closed");
        }
    }
}

/// Records notifications in arrival order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ArtifactId>>,
}

impl RecordingNotifier {
    /// Create empty recorder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications so far
    #[must_use]
    pub fn events(&self) -> Vec<ArtifactId> {
        self.events.lock().clone()
    }

    /// Drain recorded notifications
    pub fn take(&self) -> Vec<ArtifactId> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Times `id` was notified
    #[must_use]
    pub fn count(&self, id: &ArtifactId) -> usize {
        self.events.lock().iter().filter(|e| *e == id).count()
    }

    /// Total notifications
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// No notification recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl IndexNotifier for RecordingNotifier {
    async fn emit_index_dirty(&self, id: &ArtifactId) {
        self.events.lock().push(id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        let a = ArtifactId::new("p1", "wiki", "a");
        let b = ArtifactId::new("p1", "wiki", "b");

        notifier.emit_index_dirty(&a).await;
        notifier.emit_index_dirty(&b).await;

        assert_eq!(rx.recv().await, Some(a));
        assert_eq!(rx.recv().await, Some(b));
    }

    #[tokio::test]
    async fn closed_channel_is_ignored() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier
            .emit_index_dirty(&ArtifactId::new("p1", "wiki", "a"))
            .await;
    }

    #[tokio::test]
    async fn recorder_counts_and_drains() {
        let recorder = RecordingNotifier::new();
        let a = ArtifactId::new("p1", "wiki", "a");
        recorder.emit_index_dirty(&a).await;
        recorder.emit_index_dirty(&a).await;

        assert_eq!(recorder.count(&a), 2);
        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.is_empty());
    }
}
