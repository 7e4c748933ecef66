//! Artifact index
//!
//! Provides [`ArtifactIndex`], the canonical mapping from identity and from
//! `(project, tool, shorthand)` to artifact descriptors.

use crate::directory::ProjectDirectory;
use crate::error::IndexError;
use dashmap::DashMap;
use parking_lot::Mutex;
use xref_artifact::{Artifact, ArtifactId};

/// Concurrent artifact index
///
/// Readers go straight to the `DashMap`s; writers serialize on a mutex so the
/// shorthand uniqueness check and the insert happen as one step.
///
/// # Invariants
/// - At most one artifact per `(project, tool, normalized shorthand)`
/// - Every shorthand entry points at an identity present in `by_identity`
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    /// Identity -> descriptor
    by_identity: DashMap<ArtifactId, Artifact>,

    /// Normalized shorthand -> identity
    by_shorthand: DashMap<ShorthandKey, ArtifactId>,

    /// Projects known to the forge
    projects: ProjectDirectory,

    /// Serializes writers
    writer: Mutex<()>,
}

/// Shorthand lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShorthandKey {
    project: String,
    tool: String,
    key: String,
}

impl ShorthandKey {
    fn new(project: &str, tool: &str, key: impl Into<String>) -> Self {
        Self {
            project: project.to_string(),
            tool: tool.to_string(),
            key: key.into(),
        }
    }

    fn of(artifact: &Artifact) -> Self {
        let id = artifact.id();
        Self::new(id.project(), id.tool(), artifact.shorthand_key())
    }
}

impl ArtifactIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project directory
    #[inline]
    #[must_use]
    pub fn projects(&self) -> &ProjectDirectory {
        &self.projects
    }

    /// Insert or update a descriptor
    ///
    /// Idempotent: inserting an identity that already exists replaces its
    /// non-identity fields. Returns the previous descriptor, if any.
    ///
    /// # Errors
    /// Returns [`IndexError::DuplicateShorthand`] if another artifact in the
    /// same tool owns the (normalized) shorthand
    pub fn insert(&self, artifact: Artifact) -> Result<Option<Artifact>, IndexError> {
        self.put(artifact, true)
    }

    /// Insert or update a descriptor, keeping a replaced shorthand claimed
    ///
    /// On a rename the old shorthand keeps pointing at the same identity, so
    /// no other artifact can take it until the write is settled with
    /// [`ArtifactIndex::release`] or undone with [`ArtifactIndex::restore`].
    ///
    /// # Errors
    /// Returns [`IndexError::DuplicateShorthand`] if another artifact in the
    /// same tool owns the (normalized) shorthand
    pub fn insert_reserving(&self, artifact: Artifact) -> Result<Option<Artifact>, IndexError> {
        self.put(artifact, false)
    }

    fn put(&self, artifact: Artifact, release_old: bool) -> Result<Option<Artifact>, IndexError> {
        let _guard = self.writer.lock();
        let key = ShorthandKey::of(&artifact);

        if let Some(owner) = self.by_shorthand.get(&key) {
            if owner.value() != artifact.id() {
                return Err(IndexError::DuplicateShorthand {
                    project: key.project.clone(),
                    tool: key.tool.clone(),
                    shorthand: artifact.shorthand().to_string(),
                    existing: owner.value().clone(),
                });
            }
        }

        let id = artifact.id().clone();
        let previous = self.by_identity.insert(id.clone(), artifact);
        if let Some(prev) = &previous {
            let old_key = ShorthandKey::of(prev);
            if release_old && old_key != key {
                self.by_shorthand.remove(&old_key);
            }
        }
        self.by_shorthand.insert(key, id.clone());

        tracing::trace!(artifact = %id, replaced = previous.is_some(), "index insert");
        Ok(previous)
    }

    /// Free the shorthand `previous` held, unless its identity still uses it
    pub fn release(&self, previous: &Artifact) {
        let _guard = self.writer.lock();
        let id = previous.id();
        let old_key = ShorthandKey::of(previous);
        let in_use = self
            .by_identity
            .get(id)
            .is_some_and(|current| ShorthandKey::of(current.value()) == old_key);
        if !in_use {
            self.by_shorthand.remove_if(&old_key, |_, owner| owner == id);
        }
    }

    /// Put `previous` back as the descriptor of its identity
    ///
    /// Undoes an [`ArtifactIndex::insert_reserving`]: the shorthand claimed by
    /// the replaced descriptor is dropped and the reserved one reinstated.
    pub fn restore(&self, previous: Artifact) {
        let _guard = self.writer.lock();
        let id = previous.id().clone();
        let old_key = ShorthandKey::of(&previous);
        if let Some(current) = self.by_identity.insert(id.clone(), previous) {
            let current_key = ShorthandKey::of(&current);
            if current_key != old_key {
                self.by_shorthand.remove_if(&current_key, |_, owner| *owner == id);
            }
        }
        self.by_shorthand.insert(old_key, id.clone());
        tracing::trace!(artifact = %id, "index restore");
    }

    /// Remove an artifact, returning its descriptor
    ///
    /// O(1). Edges are the reference graph's concern; callers delete the
    /// artifact from the graph first.
    pub fn remove(&self, id: &ArtifactId) -> Option<Artifact> {
        let _guard = self.writer.lock();
        let (_, removed) = self.by_identity.remove(id)?;
        self.by_shorthand
            .remove_if(&ShorthandKey::of(&removed), |_, owner| owner == id);
        tracing::trace!(artifact = %id, "index remove");
        Some(removed)
    }

    /// Descriptor by identity
    #[must_use]
    pub fn get(&self, id: &ArtifactId) -> Option<Artifact> {
        self.by_identity.get(id).map(|entry| entry.value().clone())
    }

    /// Check if identity exists in index
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.by_identity.contains_key(id)
    }

    /// Lookup by identity components
    ///
    /// # Errors
    /// Returns [`IndexError::NotFound`] if absent
    pub fn lookup_by_identity(
        &self,
        project: &str,
        tool: &str,
        artifact: &str,
    ) -> Result<Artifact, IndexError> {
        let id = ArtifactId::new(project, tool, artifact);
        self.get(&id).ok_or_else(|| IndexError::not_found(id))
    }

    /// Every artifact in the tool whose shorthand matches
    ///
    /// Exact matches come first; wiki pages also match case-insensitively.
    #[must_use]
    pub fn find_by_shorthand(
        &self,
        project: &str,
        tool: &str,
        shorthand: &str,
    ) -> Vec<Artifact> {
        let mut hits: Vec<Artifact> = Vec::new();

        if let Some(found) = self.resolve_key(&ShorthandKey::new(project, tool, shorthand)) {
            hits.push(found);
        }

        let folded = shorthand.to_lowercase();
        if folded != shorthand {
            if let Some(found) = self.resolve_key(&ShorthandKey::new(project, tool, folded)) {
                if found.kind().case_insensitive_shorthand()
                    && !hits.iter().any(|h| h.id() == found.id())
                {
                    hits.push(found);
                }
            }
        }

        hits
    }

    /// Lookup by shorthand
    ///
    /// # Errors
    /// - [`IndexError::NotFound`] if nothing matches
    /// - [`IndexError::Ambiguous`] if more than one artifact matches
    pub fn lookup_by_shorthand(
        &self,
        project: &str,
        tool: &str,
        shorthand: &str,
    ) -> Result<Artifact, IndexError> {
        let mut hits = self.find_by_shorthand(project, tool, shorthand);
        match hits.len() {
            0 => Err(IndexError::not_found(format!("{project}/{tool}:{shorthand}"))),
            1 => Ok(hits.remove(0)),
            _ => Err(IndexError::Ambiguous {
                shorthand: shorthand.to_string(),
                candidates: hits.iter().map(|a| a.id().clone()).collect(),
            }),
        }
    }

    fn resolve_key(&self, key: &ShorthandKey) -> Option<Artifact> {
        let id = self.by_shorthand.get(key)?.value().clone();
        self.get(&id)
    }

    /// Identities of every artifact in a tool
    #[must_use]
    pub fn ids_in_tool(&self, project: &str, tool: &str) -> Vec<ArtifactId> {
        let mut ids: Vec<ArtifactId> = self
            .by_identity
            .iter()
            .filter(|entry| entry.key().project() == project && entry.key().tool() == tool)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Get total artifact count
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xref_artifact::ArtifactKind;

    fn page(project: &str, id: &str, title: &str) -> Artifact {
        Artifact::wiki_page(ArtifactId::new(project, "wiki", id), title)
    }

    #[test]
    fn index_insert_and_lookup() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();

        let found = index.lookup_by_identity("p1", "wiki", "w1").unwrap();
        assert_eq!(found.shorthand(), "Home");
        assert_eq!(index.lookup_by_shorthand("p1", "wiki", "Home").unwrap().id(), found.id());
    }

    #[test]
    fn index_insert_is_idempotent_update() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();
        let prev = index
            .insert(page("p1", "w1", "Home").with_source("hello"))
            .unwrap();

        assert!(prev.is_some());
        assert_eq!(index.len(), 1);
        let stored = index.get(&ArtifactId::new("p1", "wiki", "w1")).unwrap();
        assert_eq!(stored.source_text(), "hello");
    }

    #[test]
    fn index_rejects_duplicate_shorthand() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();
        let result = index.insert(page("p1", "w2", "Home"));

        assert!(matches!(result, Err(IndexError::DuplicateShorthand { .. })));
        assert!(!index.contains(&ArtifactId::new("p1", "wiki", "w2")));
    }

    #[test]
    fn wiki_duplicate_detection_folds_case() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();
        assert!(index.insert(page("p1", "w2", "HOME")).is_err());
    }

    #[test]
    fn same_shorthand_in_other_tool_is_fine() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();
        index.insert(page("p2", "w1", "Home")).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn rename_releases_old_shorthand() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();
        index.insert(page("p1", "w1", "Start")).unwrap();

        assert!(index.find_by_shorthand("p1", "wiki", "Home").is_empty());
        index.insert(page("p1", "w2", "Home")).unwrap();
    }

    #[test]
    fn wiki_lookup_is_case_insensitive() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home")).unwrap();

        for query in ["Home", "home", "HOME"] {
            assert_eq!(index.find_by_shorthand("p1", "wiki", query).len(), 1, "{query}");
        }
    }

    #[test]
    fn ticket_lookup_is_exact() {
        let index = ArtifactIndex::new();
        let t = Artifact::new(ArtifactId::new("p1", "bugs", "t1"), "Crash", ArtifactKind::Ticket);
        index.insert(t).unwrap();

        assert_eq!(index.find_by_shorthand("p1", "bugs", "Crash").len(), 1);
        assert!(index.find_by_shorthand("p1", "bugs", "crash").is_empty());
    }

    #[test]
    fn mixed_kinds_can_be_ambiguous() {
        let index = ArtifactIndex::new();
        let other_id = ArtifactId::new("p1", "misc", "o1");
        let other = Artifact::new(other_id, "Home", ArtifactKind::Other);
        let wiki = Artifact::wiki_page(ArtifactId::new("p1", "misc", "w1"), "home");
        index.insert(other).unwrap();
        index.insert(wiki).unwrap();

        let result = index.lookup_by_shorthand("p1", "misc", "Home");
        assert!(matches!(
            result,
            Err(IndexError::Ambiguous { ref candidates, .. }) if candidates.len() == 2
        ));
    }

    #[test]
    fn remove_frees_identity_and_shorthand() {
        let index = ArtifactIndex::new();
        let id = ArtifactId::new("p1", "wiki", "w1");
        index.insert(page("p1", "w1", "Home")).unwrap();

        assert!(index.remove(&id).is_some());
        assert!(index.remove(&id).is_none());
        assert!(index.is_empty());
        assert!(matches!(
            index.lookup_by_shorthand("p1", "wiki", "Home"),
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn reserved_shorthand_blocks_other_claims_until_released() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Old")).unwrap();

        let previous = index.insert_reserving(page("p1", "w1", "New")).unwrap().unwrap();
        assert!(matches!(
            index.insert(page("p1", "w2", "Old")),
            Err(IndexError::DuplicateShorthand { .. })
        ));
        assert_eq!(index.lookup_by_shorthand("p1", "wiki", "New").unwrap().id().artifact(), "w1");

        index.release(&previous);
        assert!(index.find_by_shorthand("p1", "wiki", "Old").is_empty());
        index.insert(page("p1", "w2", "Old")).unwrap();
    }

    #[test]
    fn release_keeps_unchanged_shorthand() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w1", "Home").with_source("v1")).unwrap();
        let previous = index
            .insert_reserving(page("p1", "w1", "Home").with_source("v2"))
            .unwrap()
            .unwrap();

        index.release(&previous);
        assert_eq!(index.lookup_by_shorthand("p1", "wiki", "Home").unwrap().source_text(), "v2");
    }

    #[test]
    fn restore_reinstates_previous_descriptor() {
        let index = ArtifactIndex::new();
        let id = ArtifactId::new("p1", "wiki", "w1");
        index.insert(page("p1", "w1", "Old").with_source("v1")).unwrap();
        let previous = index
            .insert_reserving(page("p1", "w1", "New").with_source("v2"))
            .unwrap()
            .unwrap();

        index.restore(previous);
        let stored = index.get(&id).unwrap();
        assert_eq!(stored.shorthand(), "Old");
        assert_eq!(stored.source_text(), "v1");
        assert!(index.find_by_shorthand("p1", "wiki", "New").is_empty());
        assert_eq!(index.lookup_by_shorthand("p1", "wiki", "Old").unwrap().id(), &id);
        index.insert(page("p1", "w2", "New")).unwrap();
    }

    #[test]
    fn ids_in_tool_sorted() {
        let index = ArtifactIndex::new();
        index.insert(page("p1", "w2", "B")).unwrap();
        index.insert(page("p1", "w1", "A")).unwrap();
        index.insert(page("p2", "w3", "C")).unwrap();

        let ids = index.ids_in_tool("p1", "wiki");
        assert_eq!(
            ids,
            vec![ArtifactId::new("p1", "wiki", "w1"), ArtifactId::new("p1", "wiki", "w2")]
        );
    }
}
