//! Reference graph
//!
//! Stores forward and reverse edges explicitly, one node per live artifact.
//! Every mutation runs under a single write lock, so readers never observe
//! a forward edge without its backreference.

use crate::error::GraphError;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use xref_artifact::ArtifactId;

/// Edge changes made by one [`ReferenceGraph::set_forward`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDiff {
    /// Targets that gained a backreference
    pub added: Vec<ArtifactId>,
    /// Targets that lost a backreference
    pub removed: Vec<ArtifactId>,
}

impl EdgeDiff {
    /// Whether the call changed no edge
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// `added ∪ removed`, the symmetric difference of old and new forward sets
    pub fn changed(&self) -> impl Iterator<Item = &ArtifactId> {
        self.added.iter().chain(self.removed.iter())
    }
}

#[derive(Debug, Default)]
struct Node {
    /// Ordered forward edges
    references: IndexSet<ArtifactId>,
    /// Reverse edges
    backreferences: IndexSet<ArtifactId>,
}

/// Bidirectional reference graph
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    nodes: RwLock<IndexMap<ArtifactId, Node>>,
}

impl ReferenceGraph {
    /// Create empty graph
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no edges
    ///
    /// Returns `false` if the node was already present (its edges are kept).
    pub fn add_node(&self, id: ArtifactId) -> bool {
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&id) {
            return false;
        }
        nodes.insert(id, Node::default());
        true
    }

    /// Check if node exists
    #[must_use]
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.nodes.read().contains_key(id)
    }

    /// Atomically replace the forward edges of `id`
    ///
    /// Self edges and duplicates are dropped; first occurrence order is kept.
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownTarget`] naming the first target (or the
    /// source itself) that is not a node. Nothing changes on error.
    pub fn set_forward<I>(&self, id: &ArtifactId, targets: I) -> Result<EdgeDiff, GraphError>
    where
        I: IntoIterator<Item = ArtifactId>,
    {
        let mut nodes = self.nodes.write();

        let Some(source) = nodes.get(id) else {
            return Err(GraphError::UnknownTarget(id.clone()));
        };

        let mut next: IndexSet<ArtifactId> = IndexSet::new();
        for target in targets {
            if target == *id {
                continue;
            }
            if !nodes.contains_key(&target) {
                return Err(GraphError::UnknownTarget(target));
            }
            next.insert(target);
        }

        let diff = EdgeDiff {
            added: next.difference(&source.references).cloned().collect(),
            removed: source.references.difference(&next).cloned().collect(),
        };

        // validated above; nothing below can fail
        for target in &diff.added {
            if let Some(node) = nodes.get_mut(target) {
                node.backreferences.insert(id.clone());
            }
        }
        for target in &diff.removed {
            if let Some(node) = nodes.get_mut(target) {
                node.backreferences.shift_remove(id);
            }
        }
        if let Some(source) = nodes.get_mut(id) {
            source.references = next;
        }

        if !diff.is_empty() {
            tracing::debug!(
                artifact = %id,
                added = diff.added.len(),
                removed = diff.removed.len(),
                "forward references replaced"
            );
        }
        Ok(diff)
    }

    /// Remove a node and every edge touching it
    ///
    /// Idempotent. Returns the artifacts whose edges changed: the former
    /// targets followed by the former referrers.
    pub fn delete(&self, id: &ArtifactId) -> Vec<ArtifactId> {
        let mut nodes = self.nodes.write();
        let Some(node) = nodes.shift_remove(id) else {
            return Vec::new();
        };

        for target in &node.references {
            if let Some(t) = nodes.get_mut(target) {
                t.backreferences.shift_remove(id);
            }
        }
        for referrer in &node.backreferences {
            if let Some(r) = nodes.get_mut(referrer) {
                r.references.shift_remove(id);
            }
        }

        tracing::debug!(
            artifact = %id,
            references = node.references.len(),
            backreferences = node.backreferences.len(),
            "node deleted"
        );
        node.references
            .into_iter()
            .chain(node.backreferences)
            .collect()
    }

    /// Drop every edge pointing at `id`, keeping the node and its own references
    ///
    /// Returns the former referrers, sorted. Used when an artifact stops being
    /// a valid link target without leaving the graph.
    pub fn detach_incoming(&self, id: &ArtifactId) -> Vec<ArtifactId> {
        let mut nodes = self.nodes.write();
        let Some(node) = nodes.get_mut(id) else {
            return Vec::new();
        };
        let mut referrers: Vec<ArtifactId> = std::mem::take(&mut node.backreferences)
            .into_iter()
            .collect();

        for referrer in &referrers {
            if let Some(r) = nodes.get_mut(referrer) {
                r.references.shift_remove(id);
            }
        }

        referrers.sort();
        tracing::debug!(artifact = %id, referrers = referrers.len(), "incoming edges detached");
        referrers
    }

    /// Forward edges of `id`, in first-occurrence order
    #[must_use]
    pub fn references(&self, id: &ArtifactId) -> Vec<ArtifactId> {
        self.nodes
            .read()
            .get(id)
            .map(|n| n.references.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Reverse edges of `id`, sorted
    #[must_use]
    pub fn backreferences(&self, id: &ArtifactId) -> Vec<ArtifactId> {
        let mut out: Vec<ArtifactId> = self
            .nodes
            .read()
            .get(id)
            .map(|n| n.backreferences.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Forward and reverse edges of `id` read under one lock
    #[must_use]
    pub fn edges(&self, id: &ArtifactId) -> Option<(Vec<ArtifactId>, Vec<ArtifactId>)> {
        let nodes = self.nodes.read();
        let node = nodes.get(id)?;
        let mut back: Vec<ArtifactId> = node.backreferences.iter().cloned().collect();
        back.sort();
        Some((node.references.iter().cloned().collect(), back))
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Number of forward edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.read().values().map(|n| n.references.len()).sum()
    }

    /// Validate the whole graph
    ///
    /// Checks that every forward edge has its reverse edge and vice versa,
    /// that no node references itself and that no edge leaves the node set.
    ///
    /// # Errors
    /// Returns [`GraphError::Consistency`] describing the first violation
    pub fn verify(&self) -> Result<(), GraphError> {
        let nodes = self.nodes.read();

        for (id, node) in nodes.iter() {
            if node.references.contains(id) {
                return Err(GraphError::Consistency(format!("{id} references itself")));
            }
            for target in &node.references {
                let Some(t) = nodes.get(target) else {
                    return Err(GraphError::Consistency(format!(
                        "{id} references missing node {target}"
                    )));
                };
                if !t.backreferences.contains(id) {
                    return Err(GraphError::Consistency(format!(
                        "{id} -> {target} has no backreference"
                    )));
                }
            }
            for referrer in &node.backreferences {
                let Some(r) = nodes.get(referrer) else {
                    return Err(GraphError::Consistency(format!(
                        "{id} backreferenced by missing node {referrer}"
                    )));
                };
                if !r.references.contains(id) {
                    return Err(GraphError::Consistency(format!(
                        "{referrer} -> {id} backreference has no forward edge"
                    )));
                }
            }
        }

        Ok(())
    }
}
