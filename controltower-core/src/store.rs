//! In-memory project repository
//!
//! Passed explicitly to whatever needs it; there is no process-wide store.
//! Projects keep insertion order.

use crate::derived::DerivedMetrics;
use crate::project::{NewProject, Project, ProjectEdit, ProjectError, ProjectStatus};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStore {
    projects: Vec<Project>,
}

impl ProjectStore {
    pub fn new() -> Self {
        ProjectStore::default()
    }

    /// Build a store from existing projects, rejecting duplicate ids
    pub fn from_projects(projects: Vec<Project>) -> Result<Self, ProjectError> {
        let mut store = ProjectStore::new();
        for project in projects {
            store.add(project)?;
        }
        Ok(store)
    }

    pub fn add(&mut self, project: Project) -> Result<(), ProjectError> {
        if self.get(&project.id).is_some() {
            return Err(ProjectError::Duplicate(project.id));
        }
        tracing::debug!(project = %project.id, "project added");
        self.projects.push(project);
        Ok(())
    }

    /// Validate and insert a new project under a fresh `p<N>` id
    pub fn create(&mut self, input: NewProject) -> Result<&Project, ProjectError> {
        let id = self.next_id();
        let project = input.into_project(id)?;
        self.add(project)?;
        Ok(&self.projects[self.projects.len() - 1])
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Apply an edit to a stored project
    pub fn update(&mut self, id: &str, edit: ProjectEdit) -> Result<DerivedMetrics, ProjectError> {
        let project = self
            .get_mut(id)
            .ok_or_else(|| ProjectError::NotFound(id.to_string()))?;
        let derived = project.apply_edit(edit)?;
        tracing::debug!(project = id, burn_rate = derived.burn_rate, "project updated");
        Ok(derived)
    }

    pub fn remove(&mut self, id: &str) -> Result<Project, ProjectError> {
        let pos = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ProjectError::NotFound(id.to_string()))?;
        tracing::debug!(project = id, "project removed");
        Ok(self.projects.remove(pos))
    }

    pub fn list(&self) -> &[Project] {
        &self.projects
    }

    /// Projects past the proposal stage
    pub fn active(&self) -> impl Iterator<Item = &Project> {
        self.projects
            .iter()
            .filter(|p| p.status != ProjectStatus::Proposal)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Snapshot derived metrics into every project from its current costs
    pub fn recompute_derived(&mut self) -> usize {
        let mut changed = 0;
        for project in &mut self.projects {
            let derived = project.derived_metrics();
            let stale = derived
                .entries()
                .iter()
                .any(|(k, v)| project.metrics.get(k) != *v || !project.metrics.contains(k));
            if stale {
                project.metrics.apply_derived(&derived);
                changed += 1;
            }
        }
        changed
    }

    fn next_id(&self) -> String {
        let max = self
            .projects
            .iter()
            .filter_map(|p| p.id.strip_prefix('p').and_then(|n| n.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);
        format!("p{}", max + 1)
    }

    /// Load a JSON array of projects
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read projects file: {}", path.display()))?;
        let projects: Vec<Project> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse projects file: {}", path.display()))?;
        let store = ProjectStore::from_projects(projects)
            .with_context(|| format!("invalid projects file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), projects = store.len(), "projects loaded");
        Ok(store)
    }

    /// Write the store as a pretty JSON array, atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.projects)
            .context("failed to serialize projects")?;
        atomic_write(path, &json)
    }
}

/// Replace `path` with `contents` without leaving a half-written file
///
/// The temp file lives beside the target so the final rename stays on one
/// filesystem.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to stage write in: {}", dir.display()))?;
    staged
        .write_all(contents.as_bytes())
        .and_then(|()| staged.as_file().sync_all())
        .with_context(|| format!("failed to write projects for: {}", path.display()))?;
    staged
        .persist(path)
        .with_context(|| format!("failed to replace: {}", path.display()))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "projects written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{CostEntry, CostKind, Industry, Priority};

    fn input(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: String::new(),
            client_id: "cl1".to_string(),
            industry: Industry::Fintech,
            status: ProjectStatus::InDevelopment,
            priority: Priority::High,
            budget: 10000.0,
            start_date: "2025-02-01".to_string(),
            end_date: "2025-09-01".to_string(),
            team_ids: Vec::new(),
            tech_stack: Vec::new(),
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut store = ProjectStore::new();
        let a = store.create(input("A")).unwrap().id.clone();
        let b = store.create(input("B")).unwrap().id.clone();
        assert_eq!(a, "p1");
        assert_eq!(b, "p2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = ProjectStore::new();
        let project = input("A").into_project("p7").unwrap();
        store.add(project.clone()).unwrap();
        assert_eq!(
            store.add(project),
            Err(ProjectError::Duplicate("p7".to_string()))
        );
        assert_eq!(store.create(input("B")).unwrap().id, "p8");
    }

    #[test]
    fn test_update_and_remove_missing() {
        let mut store = ProjectStore::new();
        store.create(input("A")).unwrap();
        let edit = store.get("p1").unwrap().to_edit();
        assert!(matches!(
            store.update("p404", edit.clone()),
            Err(ProjectError::NotFound(_))
        ));
        assert!(store.update("p1", edit).is_ok());
        assert!(matches!(store.remove("p404"), Err(ProjectError::NotFound(_))));
        assert_eq!(store.remove("p1").unwrap().name, "A");
        assert!(store.is_empty());
    }

    #[test]
    fn test_active_skips_proposals() {
        let mut store = ProjectStore::new();
        let mut proposal = input("Pitch");
        proposal.status = ProjectStatus::Proposal;
        store.create(proposal).unwrap();
        store.create(input("Live")).unwrap();
        let active: Vec<&str> = store.active().map(|p| p.name.as_str()).collect();
        assert_eq!(active, vec!["Live"]);
    }

    #[test]
    fn test_recompute_derived_counts_changes() {
        let mut store = ProjectStore::new();
        store.create(input("A")).unwrap();
        store.create(input("B")).unwrap();
        store.get_mut("p1").unwrap().fixed_costs.push(CostEntry {
            id: "c1".to_string(),
            label: "Rent".to_string(),
            amount: 2000.0,
        });
        // p2 has no costs: runway sentinel differs from the stored zero
        assert_eq!(store.recompute_derived(), 2);
        assert_eq!(store.get("p1").unwrap().metric("burnRate"), 2000.0);
        assert_eq!(store.get("p2").unwrap().metric("runway"), 999.0);
        assert_eq!(store.recompute_derived(), 0);
        assert_eq!(store.get("p1").unwrap().costs(CostKind::Fixed).len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let mut store = ProjectStore::new();
        store.create(input("A")).unwrap();
        store.save(&path).unwrap();

        let loaded = ProjectStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_save_replaces_existing_file_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("projects.json");

        let mut store = ProjectStore::new();
        store.create(input("A")).unwrap();
        store.save(&path).unwrap();
        store.create(input("B")).unwrap();
        store.save(&path).unwrap();

        assert_eq!(ProjectStore::load(&path).unwrap().len(), 2);
        // only the target remains, no staged leftovers
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let project = input("A").into_project("p1").unwrap();
        let json = serde_json::to_string(&vec![project.clone(), project]).unwrap();
        std::fs::write(&path, json).unwrap();
        assert!(ProjectStore::load(&path).is_err());
    }
}
