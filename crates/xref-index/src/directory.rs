//! Project directory
//!
//! Maps project ids to [`Project`] records and `(neighborhood, shortname)`
//! back to ids.

use crate::error::IndexError;
use dashmap::DashMap;
use parking_lot::Mutex;
use xref_artifact::Project;

/// Concurrent project directory
#[derive(Debug, Default)]
pub struct ProjectDirectory {
    by_id: DashMap<String, Project>,
    by_path: DashMap<(String, String), String>,
    writer: Mutex<()>,
}

impl ProjectDirectory {
    /// Create empty directory
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a project
    ///
    /// # Errors
    /// Returns [`IndexError::DuplicateProject`] if another project already
    /// owns the shortname in the neighborhood
    pub fn register(&self, project: Project) -> Result<(), IndexError> {
        let _guard = self.writer.lock();
        let path = (project.neighborhood.clone(), project.shortname.clone());

        if let Some(owner) = self.by_path.get(&path) {
            if *owner.value() != project.id {
                return Err(IndexError::DuplicateProject {
                    neighborhood: project.neighborhood,
                    shortname: project.shortname,
                });
            }
        }

        if let Some(previous) = self.by_id.insert(project.id.clone(), project.clone()) {
            let old_path = (previous.neighborhood, previous.shortname);
            if old_path != path {
                self.by_path.remove(&old_path);
            }
        }
        self.by_path.insert(path, project.id);
        Ok(())
    }

    /// Remove a project record
    pub fn remove(&self, id: &str) -> Option<Project> {
        let _guard = self.writer.lock();
        let (_, project) = self.by_id.remove(id)?;
        self.by_path
            .remove(&(project.neighborhood.clone(), project.shortname.clone()));
        Some(project)
    }

    /// Project by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Project> {
        self.by_id.get(id).map(|p| p.value().clone())
    }

    /// Project by neighborhood and shortname path
    #[must_use]
    pub fn by_shortname(&self, neighborhood: &str, shortname: &str) -> Option<Project> {
        let id = self
            .by_path
            .get(&(neighborhood.to_string(), shortname.to_string()))?
            .value()
            .clone();
        self.get(&id)
    }

    /// Project id a shortname resolves to
    ///
    /// Unregistered shortnames are taken as the project id itself, so forges
    /// that never populate the directory still resolve `[p2:wiki:Home]`.
    #[must_use]
    pub fn resolve_id(&self, neighborhood: &str, shortname: &str) -> String {
        self.by_shortname(neighborhood, shortname)
            .map_or_else(|| shortname.to_string(), |p| p.id)
    }

    /// Number of registered projects
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if no project is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let dir = ProjectDirectory::new();
        dir.register(Project::new("id-1", "tools", "p")).unwrap();

        assert_eq!(dir.by_shortname("p", "tools").unwrap().id, "id-1");
        assert!(dir.by_shortname("u", "tools").is_none());
        assert_eq!(dir.resolve_id("p", "tools"), "id-1");
        assert_eq!(dir.resolve_id("p", "unregistered"), "unregistered");
    }

    #[test]
    fn rejects_duplicate_shortname() {
        let dir = ProjectDirectory::new();
        dir.register(Project::new("id-1", "tools", "p")).unwrap();
        let err = dir.register(Project::new("id-2", "tools", "p")).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateProject { .. }));
        dir.register(Project::new("id-2", "tools", "u")).unwrap();
    }

    #[test]
    fn rename_moves_path() {
        let dir = ProjectDirectory::new();
        dir.register(Project::new("id-1", "tools", "p")).unwrap();
        dir.register(Project::new("id-1", "utils", "p")).unwrap();

        assert!(dir.by_shortname("p", "tools").is_none());
        assert_eq!(dir.by_shortname("p", "utils").unwrap().id, "id-1");
    }

    #[test]
    fn remove_clears_both_maps() {
        let dir = ProjectDirectory::new();
        dir.register(Project::new("id-1", "tools", "p")).unwrap();
        assert!(dir.remove("id-1").is_some());
        assert!(dir.is_empty());
        assert!(dir.by_shortname("p", "tools").is_none());
    }
}
