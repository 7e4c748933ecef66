//! Cross-reference coordinator
//!
//! The single write path for artifacts. Each write runs, in order:
//!
//! 1. index mutation
//! 2. render of the new source, collecting resolved shortlinks
//! 3. replacement of the artifact's forward edges in the graph (commit)
//! 4. index-dirty notifications
//!
//! Writes to one artifact are serialized on a per-artifact lock. A deadline
//! is honored up to the commit; after it the write always completes and
//! notifications are always delivered. Nothing between the index mutation and
//! the commit awaits, so a dropped future cannot leave a partial write.

use crate::config::XrefConfig;
use crate::error::XrefError;
use crate::locks::{ArtifactGuard, ArtifactLocks};
use crate::notify::IndexNotifier;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use xref_artifact::{Artifact, ArtifactContext, ArtifactHost, ArtifactId, Viewer};
use xref_graph::{EdgeDiff, GraphError, ReferenceGraph};
use xref_index::ArtifactIndex;
use xref_markup::{MarkdownRenderer, Rendered};

/// Per-call write options
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Viewer whose read permissions filter shortlink resolution
    pub viewer: Option<Viewer>,
    /// Give up if the write has not committed by then
    pub deadline: Option<Instant>,
}

impl WriteOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With viewer
    #[inline]
    #[must_use]
    pub fn with_viewer(mut self, viewer: Viewer) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// With absolute deadline
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// With deadline relative to now
    #[inline]
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Result of a committed create or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Written artifact
    pub artifact: ArtifactId,
    /// Forward edges added and removed by this write
    pub diff: EdgeDiff,
    /// Rendered HTML of the new source
    pub html: String,
    /// Former referrers that lost their edge because the artifact is now
    /// flagged deleted
    pub detached: Vec<ArtifactId>,
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Removed descriptor
    pub removed: Artifact,
    /// Artifacts that lost an edge to or from the removed one
    pub affected: Vec<ArtifactId>,
}

/// Read-side view of an artifact and its edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Descriptor
    pub artifact: Artifact,
    /// Forward references in discovery order
    pub references: Vec<ArtifactId>,
    /// Back-references sorted by identity
    pub backreferences: Vec<ArtifactId>,
}

/// Coordinates index, renderer, graph and notifier on artifact writes
#[derive(Debug)]
pub struct Coordinator {
    index: Arc<ArtifactIndex>,
    graph: Arc<ReferenceGraph>,
    renderer: MarkdownRenderer,
    notifier: Arc<dyn IndexNotifier>,
    locks: ArtifactLocks,
    config: XrefConfig,
}

impl Coordinator {
    /// Create coordinator with default configuration
    #[must_use]
    pub fn new(
        index: Arc<ArtifactIndex>,
        graph: Arc<ReferenceGraph>,
        host: Arc<dyn ArtifactHost>,
        notifier: Arc<dyn IndexNotifier>,
    ) -> Self {
        Self::with_config(index, graph, host, notifier, XrefConfig::default())
    }

    /// Create coordinator
    #[must_use]
    pub fn with_config(
        index: Arc<ArtifactIndex>,
        graph: Arc<ReferenceGraph>,
        host: Arc<dyn ArtifactHost>,
        notifier: Arc<dyn IndexNotifier>,
        config: XrefConfig,
    ) -> Self {
        let renderer =
            MarkdownRenderer::with_options(Arc::clone(&index), host, config.render.clone());
        Self {
            index,
            graph,
            renderer,
            notifier,
            locks: ArtifactLocks::new(),
            config,
        }
    }

    /// Artifact index
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<ArtifactIndex> {
        &self.index
    }

    /// Reference graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &Arc<ReferenceGraph> {
        &self.graph
    }

    /// Renderer
    #[inline]
    #[must_use]
    pub fn renderer(&self) -> &MarkdownRenderer {
        &self.renderer
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &XrefConfig {
        &self.config
    }

    /// Register a new artifact with its source
    ///
    /// An identity already in the index is overwritten (upsert).
    ///
    /// # Errors
    /// - [`XrefError::DuplicateShorthand`] if another artifact in the tool
    ///   owns the shorthand
    /// - [`XrefError::GraphConsistency`] if the graph rejected the edges
    /// - [`XrefError::DeadlineExceeded`] if the deadline passed before commit
    pub async fn on_create(
        &self,
        artifact: Artifact,
        source: &str,
    ) -> Result<WriteReport, XrefError> {
        self.on_create_with(artifact, source, WriteOptions::default()).await
    }

    /// [`Coordinator::on_create`] with options
    ///
    /// # Errors
    /// See [`Coordinator::on_create`]
    pub async fn on_create_with(
        &self,
        artifact: Artifact,
        source: &str,
        opts: WriteOptions,
    ) -> Result<WriteReport, XrefError> {
        let id = artifact.id().clone();
        let span = tracing::info_span!("xref.on_create", artifact = %id);
        async move {
            let deadline = self.deadline(&opts);
            let _guard = self.acquire(&id, deadline, "on_create").await?;
            check_deadline(deadline, "on_create", &id)?;

            let report = self.apply(artifact, source, &opts, deadline, "on_create")?;

            tracing::info!(added = report.diff.added.len(), "artifact created");
            self.notify(dirty_set(&id, report.detached.iter())).await;
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Replace an artifact's source and re-link it
    ///
    /// The descriptor may carry a new shorthand (rename). Notifies the
    /// artifact and every target whose back-references changed. A descriptor
    /// flagged deleted also loses its incoming edges, and the former
    /// referrers are notified.
    ///
    /// # Errors
    /// - [`XrefError::NotFound`] if the identity is not indexed
    /// - [`XrefError::DuplicateShorthand`] if a rename collides
    /// - [`XrefError::GraphConsistency`] if the graph rejected the edges
    /// - [`XrefError::DeadlineExceeded`] if the deadline passed before commit
    pub async fn on_update(
        &self,
        artifact: Artifact,
        source: &str,
    ) -> Result<WriteReport, XrefError> {
        self.on_update_with(artifact, source, WriteOptions::default()).await
    }

    /// [`Coordinator::on_update`] with options
    ///
    /// # Errors
    /// See [`Coordinator::on_update`]
    pub async fn on_update_with(
        &self,
        artifact: Artifact,
        source: &str,
        opts: WriteOptions,
    ) -> Result<WriteReport, XrefError> {
        let id = artifact.id().clone();
        let span = tracing::info_span!("xref.on_update", artifact = %id);
        async move {
            let deadline = self.deadline(&opts);
            let _guard = self.acquire(&id, deadline, "on_update").await?;
            check_deadline(deadline, "on_update", &id)?;

            if !self.index.contains(&id) {
                return Err(XrefError::NotFound(id.clone()));
            }
            let report = self.apply(artifact, source, &opts, deadline, "on_update")?;

            tracing::info!(
                added = report.diff.added.len(),
                removed = report.diff.removed.len(),
                detached = report.detached.len(),
                "artifact updated"
            );
            let changed = report.diff.changed().chain(&report.detached);
            self.notify(dirty_set(&id, changed)).await;
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Remove an artifact and every edge touching it
    ///
    /// Returns `None` without notifying if the artifact is unknown.
    ///
    /// # Errors
    /// Returns [`XrefError::DeadlineExceeded`] if the lock could not be
    /// taken before the deadline
    pub async fn on_delete(&self, id: &ArtifactId) -> Result<Option<DeleteReport>, XrefError> {
        self.on_delete_with(id, WriteOptions::default()).await
    }

    /// [`Coordinator::on_delete`] with options
    ///
    /// # Errors
    /// See [`Coordinator::on_delete`]
    pub async fn on_delete_with(
        &self,
        id: &ArtifactId,
        opts: WriteOptions,
    ) -> Result<Option<DeleteReport>, XrefError> {
        let span = tracing::info_span!("xref.on_delete", artifact = %id);
        async move {
            let deadline = self.deadline(&opts);
            let _guard = self.acquire(id, deadline, "on_delete").await?;
            check_deadline(deadline, "on_delete", id)?;

            let affected = self.graph.delete(id);
            let Some(removed) = self.index.remove(id) else {
                tracing::debug!("delete of unknown artifact ignored");
                return Ok(None);
            };

            tracing::info!(affected = affected.len(), "artifact deleted");
            self.notify([id.clone()]).await;
            Ok(Some(DeleteReport { removed, affected }))
        }
        .instrument(span)
        .await
    }

    /// Render Markdown with the configured raw HTML mode
    #[must_use]
    pub fn render(&self, source: &str, ctx: &ArtifactContext) -> Rendered {
        self.renderer.render(source, ctx)
    }

    /// Render Markdown with raw HTML escaped
    #[must_use]
    pub fn render_safe(&self, source: &str, ctx: &ArtifactContext) -> Rendered {
        self.renderer.render_safe(source, ctx)
    }

    /// Re-render an artifact's stored source
    #[must_use]
    pub fn render_current(&self, id: &ArtifactId, ctx: &ArtifactContext) -> Option<Rendered> {
        let artifact = self.index.get(id)?;
        let ctx = ctx.clone().with_current(id.clone());
        Some(self.renderer.render(artifact.source_text(), &ctx))
    }

    /// Descriptor with its current edges
    #[must_use]
    pub fn snapshot(&self, id: &ArtifactId) -> Option<Snapshot> {
        let artifact = self.index.get(id)?;
        let (references, backreferences) = self.graph.edges(id).unwrap_or_default();
        Some(Snapshot {
            artifact,
            references,
            backreferences,
        })
    }

    fn deadline(&self, opts: &WriteOptions) -> Option<Instant> {
        opts.deadline
            .or_else(|| self.config.default_deadline().map(|d| Instant::now() + d))
    }

    async fn acquire(
        &self,
        id: &ArtifactId,
        deadline: Option<Instant>,
        operation: &'static str,
    ) -> Result<ArtifactGuard<'_>, XrefError> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.locks.lock(id))
                .await
                .map_err(|_| {
                    tracing::warn!("deadline expired waiting for artifact lock");
                    XrefError::DeadlineExceeded {
                        operation,
                        artifact: id.clone(),
                    }
                }),
            None => Ok(self.locks.lock(id).await),
        }
    }

    /// Resolution context for rendering an artifact's own source
    fn write_context(&self, id: &ArtifactId, opts: &WriteOptions) -> ArtifactContext {
        let neighborhood = self
            .index
            .projects()
            .get(id.project())
            .map_or_else(|| self.config.default_neighborhood.clone(), |p| p.neighborhood);
        let ctx = ArtifactContext::for_artifact(neighborhood, id);
        match &opts.viewer {
            Some(viewer) => ctx.with_viewer(viewer.clone()),
            None => ctx,
        }
    }

    /// Index, render and link one artifact while its lock is held
    ///
    /// A renamed-away shorthand stays reserved until the commit succeeds, so
    /// a rollback can always put the previous descriptor back.
    fn apply(
        &self,
        artifact: Artifact,
        source: &str,
        opts: &WriteOptions,
        deadline: Option<Instant>,
        operation: &'static str,
    ) -> Result<WriteReport, XrefError> {
        let id = artifact.id().clone();
        let deleted = artifact.is_deleted();
        let previous = self
            .index
            .insert_reserving(artifact.with_source(source))
            .map_err(|e| XrefError::from_index(e, &id))?;
        let new_node = self.graph.add_node(id.clone());

        let rendered = self.renderer.render(source, &self.write_context(&id, opts));
        let committed = check_deadline(deadline, operation, &id)
            .and_then(|()| self.commit_forward(&id, rendered.ref_ids()));
        let diff = match committed {
            Ok(diff) => diff,
            Err(err) => {
                self.rollback(&id, previous, new_node);
                return Err(err);
            }
        };

        if let Some(previous) = &previous {
            self.index.release(previous);
        }
        // a deleted artifact is never a link target
        let detached = if deleted {
            self.graph.detach_incoming(&id)
        } else {
            Vec::new()
        };
        Ok(WriteReport {
            artifact: id,
            diff,
            html: rendered.html,
            detached,
        })
    }

    /// Replace forward edges, dropping targets the graph does not know
    fn commit_forward(
        &self,
        id: &ArtifactId,
        mut targets: Vec<ArtifactId>,
    ) -> Result<EdgeDiff, XrefError> {
        let mut retries = self.config.coordinator.unknown_target_retries;
        loop {
            match self.graph.set_forward(id, targets.iter().cloned()) {
                Ok(diff) => return Ok(diff),
                Err(GraphError::UnknownTarget(target)) if retries > 0 && target != *id => {
                    retries -= 1;
                    tracing::warn!(target = %target, "dropping reference to unknown artifact");
                    targets.retain(|t| *t != target);
                }
                Err(source) => {
                    tracing::error!(error = %source, "reference graph rejected write");
                    return Err(XrefError::GraphConsistency {
                        artifact: id.clone(),
                        source,
                    });
                }
            }
        }
    }

    /// Undo the index write (and node insertion) of a failed write
    fn rollback(&self, id: &ArtifactId, previous: Option<Artifact>, new_node: bool) {
        match previous {
            Some(previous) => self.index.restore(previous),
            None => {
                self.index.remove(id);
            }
        }
        if new_node {
            self.graph.delete(id);
        }
        tracing::debug!("write rolled back");
    }

    async fn notify(&self, ids: impl IntoIterator<Item = ArtifactId>) {
        let notifier = &self.notifier;
        stream::iter(ids)
            .for_each(|id| async move {
                tracing::trace!(artifact = %id, "index dirty");
                notifier.emit_index_dirty(&id).await;
            })
            .await;
    }
}

/// `id` followed by every other artifact in `changed`, without repeats
fn dirty_set<'a>(
    id: &ArtifactId,
    changed: impl Iterator<Item = &'a ArtifactId>,
) -> Vec<ArtifactId> {
    let mut dirty = vec![id.clone()];
    for other in changed {
        if !dirty.contains(other) {
            dirty.push(other.clone());
        }
    }
    dirty
}

fn check_deadline(
    deadline: Option<Instant>,
    operation: &'static str,
    id: &ArtifactId,
) -> Result<(), XrefError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => {
            tracing::warn!(operation, "deadline expired before commit");
            Err(XrefError::DeadlineExceeded {
                operation,
                artifact: id.clone(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use xref_artifact::{DefaultHost, Project};

    fn setup() -> (Coordinator, Arc<RecordingNotifier>) {
        let index = Arc::new(ArtifactIndex::new());
        index.projects().register(Project::new("p1", "p1", "p")).unwrap();
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = Coordinator::new(
            index,
            Arc::new(ReferenceGraph::new()),
            Arc::new(DefaultHost),
            Arc::clone(&notifier) as Arc<dyn IndexNotifier>,
        );
        (coordinator, notifier)
    }

    fn page(id: &str, title: &str) -> Artifact {
        Artifact::wiki_page(ArtifactId::new("p1", "wiki", id), title)
    }

    #[tokio::test]
    async fn create_links_and_notifies_once() {
        let (c, notifier) = setup();
        c.on_create(page("b", "B"), "target").await.unwrap();
        notifier.take();

        let report = c.on_create(page("a", "A"), "see [B]").await.unwrap();
        let a = ArtifactId::new("p1", "wiki", "a");
        let b = ArtifactId::new("p1", "wiki", "b");

        assert_eq!(report.diff.added, vec![b.clone()]);
        assert!(report.html.contains("href=\"/p1/wiki/B\""));
        assert_eq!(c.graph().backreferences(&b), vec![a.clone()]);
        assert_eq!(notifier.events(), vec![a]);
    }

    #[tokio::test]
    async fn create_stores_source() {
        let (c, _) = setup();
        c.on_create(page("a", "A"), "hello").await.unwrap();
        let stored = c.index().get(&ArtifactId::new("p1", "wiki", "a")).unwrap();
        assert_eq!(stored.source_text(), "hello");
    }

    #[tokio::test]
    async fn update_notifies_symmetric_difference() {
        let (c, notifier) = setup();
        for (id, title) in [("b", "B"), ("x", "X"), ("y", "Y")] {
            c.on_create(page(id, title), "").await.unwrap();
        }
        c.on_create(page("a", "A"), "[B] [X]").await.unwrap();
        notifier.take();

        c.on_update(page("a", "A"), "[B] [Y]").await.unwrap();
        assert_eq!(
            notifier.events(),
            vec![
                ArtifactId::new("p1", "wiki", "a"),
                ArtifactId::new("p1", "wiki", "y"),
                ArtifactId::new("p1", "wiki", "x"),
            ]
        );
    }

    #[tokio::test]
    async fn update_of_unknown_artifact_fails() {
        let (c, notifier) = setup();
        let err = c.on_update(page("a", "A"), "x").await.unwrap_err();
        assert!(matches!(err, XrefError::NotFound(_)));
        assert!(notifier.is_empty());
        assert!(c.index().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_artifact_is_silent() {
        let (c, notifier) = setup();
        let out = c.on_delete(&ArtifactId::new("p1", "wiki", "a")).await.unwrap();
        assert!(out.is_none());
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn expired_deadline_changes_nothing() {
        let (c, notifier) = setup();
        let opts = WriteOptions::new().with_deadline(Instant::now());
        let err = c
            .on_create_with(page("a", "A"), "x", opts)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(c.index().is_empty());
        assert_eq!(c.graph().node_count(), 0);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn snapshot_reports_edges() {
        let (c, _) = setup();
        c.on_create(page("b", "B"), "").await.unwrap();
        c.on_create(page("a", "A"), "[B]").await.unwrap();

        let a = c.snapshot(&ArtifactId::new("p1", "wiki", "a")).unwrap();
        assert_eq!(a.references, vec![ArtifactId::new("p1", "wiki", "b")]);
        let b = c.snapshot(&ArtifactId::new("p1", "wiki", "b")).unwrap();
        assert_eq!(b.backreferences, vec![ArtifactId::new("p1", "wiki", "a")]);
        assert!(c.snapshot(&ArtifactId::new("p1", "wiki", "zz")).is_none());
    }

    #[tokio::test]
    async fn render_current_uses_stored_source() {
        let (c, _) = setup();
        c.on_create(page("b", "B"), "").await.unwrap();
        c.on_create(page("a", "A"), "[B]").await.unwrap();

        let a = ArtifactId::new("p1", "wiki", "a");
        let ctx = ArtifactContext::new("p", "p1", "wiki");
        let out = c.render_current(&a, &ctx).unwrap();
        assert_eq!(out.ref_ids(), vec![ArtifactId::new("p1", "wiki", "b")]);
    }
}
