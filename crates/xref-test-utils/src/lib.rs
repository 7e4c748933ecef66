//! Testing utilities for the forge cross-reference workspace
//!
//! Fixture builders, a permission-denying host and graph assertions.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::Arc;
use xref_artifact::{Artifact, ArtifactHost, ArtifactId, DefaultHost, Project, Viewer};
use xref_core::{Coordinator, IndexNotifier, XrefConfig};
use xref_graph::ReferenceGraph;
use xref_index::ArtifactIndex;

pub use xref_core::RecordingNotifier;

pub fn id(project: &str, tool: &str, artifact: &str) -> ArtifactId {
    ArtifactId::new(project, tool, artifact)
}

pub fn wiki(project: &str, artifact: &str, title: &str) -> Artifact {
    Artifact::wiki_page(id(project, "wiki", artifact), title)
}

pub fn ticket(project: &str, artifact: &str, number: u64) -> Artifact {
    Artifact::ticket(id(project, "tickets", artifact), number)
}

/// Host that hides whole tools (or single artifacts) from non-admin viewers
#[derive(Debug, Default)]
pub struct DenyHost {
    tools: HashSet<String>,
    artifacts: HashSet<ArtifactId>,
    admin: Option<String>,
}

impl DenyHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_tool(mut self, tool: &str) -> Self {
        self.tools.insert(tool.to_string());
        self
    }

    pub fn deny_artifact(mut self, id: ArtifactId) -> Self {
        self.artifacts.insert(id);
        self
    }

    pub fn with_admin(mut self, name: &str) -> Self {
        self.admin = Some(name.to_string());
        self
    }
}

impl ArtifactHost for DenyHost {
    fn can_read(&self, viewer: &Viewer, artifact: &Artifact) -> bool {
        if self.admin.as_deref() == Some(viewer.name()) {
            return true;
        }
        !self.tools.contains(artifact.id().tool()) && !self.artifacts.contains(artifact.id())
    }

    fn canonical_url(&self, artifact: &Artifact) -> String {
        DefaultHost.canonical_url(artifact)
    }

    fn short_label(&self, artifact: &Artifact) -> String {
        DefaultHost.short_label(artifact)
    }
}

/// Coordinator with its collaborators exposed
#[derive(Debug, Clone)]
pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub index: Arc<ArtifactIndex>,
    pub graph: Arc<ReferenceGraph>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Forward and back references of an artifact
    pub fn edges(&self, id: &ArtifactId) -> (Vec<ArtifactId>, Vec<ArtifactId>) {
        self.graph.edges(id).unwrap_or_default()
    }

    /// Graph invariants hold and every indexed artifact is a node
    ///
    /// Only meaningful when all writes went through the coordinator.
    pub fn assert_consistent(&self) {
        assert_graph_consistent(&self.graph);
        assert_eq!(
            self.index.len(),
            self.graph.node_count(),
            "index and graph disagree on the artifact set"
        );
    }
}

/// Builder for [`Harness`]
#[derive(Debug)]
pub struct Fixture {
    projects: Vec<Project>,
    host: Arc<dyn ArtifactHost>,
    config: XrefConfig,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            host: Arc::new(DefaultHost),
            config: XrefConfig::default(),
        }
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level project whose id equals its shortname
    pub fn project(mut self, name: &str) -> Self {
        self.projects.push(Project::new(name, name, "p"));
        self
    }

    pub fn subproject(mut self, id: &str, shortname: &str) -> Self {
        self.projects.push(Project::new(id, shortname, "p"));
        self
    }

    pub fn host(mut self, host: impl ArtifactHost + 'static) -> Self {
        self.host = Arc::new(host);
        self
    }

    pub fn config(mut self, config: XrefConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let index = Arc::new(ArtifactIndex::new());
        for project in self.projects {
            index
                .projects()
                .register(project)
                .expect("fixture projects are unique");
        }
        let graph = Arc::new(ReferenceGraph::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = Coordinator::with_config(
            Arc::clone(&index),
            Arc::clone(&graph),
            self.host,
            Arc::clone(&notifier) as Arc<dyn IndexNotifier>,
            self.config,
        );
        Harness {
            coordinator: Arc::new(coordinator),
            index,
            graph,
            notifier,
        }
    }
}

/// Panics with the graph's own diagnosis if forward and back edges disagree
pub fn assert_graph_consistent(graph: &ReferenceGraph) {
    if let Err(err) = graph.verify() {
        panic!("{err}");
    }
}
