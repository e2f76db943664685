// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! On-disk project: a directory holding the protocol records and labels.

use crate::errors::ProjectError;
use crate::graph::{LabelRegistry, NodeId, ProtocolNode, WorkflowGraph};
use crate::observability::messages::project::ProjectCreated;
use crate::observability::messages::StructuredLog;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const WORKFLOW_FILE: &str = "workflow.json";
pub const LABELS_FILE: &str = "labels.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Protocol records as written to `workflow.json`, in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub protocols: Vec<ProtocolNode>,
    pub summary: Vec<NodeId>,
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ProjectError + '_ {
    move |source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    name: String,
    path: PathBuf,
}

impl ProjectStore {
    /// Create `projects_path/name`. Fails if it already exists.
    pub fn create(projects_path: &Path, name: &str) -> Result<Self, ProjectError> {
        fs::create_dir_all(projects_path).map_err(io_error(projects_path))?;
        let path = projects_path.join(name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProjectError::AlreadyExists(path))
            }
            Err(source) => return Err(ProjectError::Io { path, source }),
        }

        ProjectCreated {
            name,
            path: &path,
        }
        .log();
        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    /// Open an existing project. A symlinked project resolves to its target.
    pub fn open(projects_path: &Path, name: &str) -> Result<Self, ProjectError> {
        let link = projects_path.join(name);
        if !link.is_dir() {
            return Err(ProjectError::NotFound {
                name: name.to_string(),
                path: projects_path.to_path_buf(),
            });
        }
        let path = fs::canonicalize(&link).map_err(io_error(&link))?;
        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ProjectError> {
        let path = self.file(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(io_error(&path))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ProjectError> {
        let path = self.file(name);
        let text = fs::read_to_string(&path).map_err(io_error(&path))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the protocols, then the labels.
    pub fn persist(&self, graph: &WorkflowGraph) -> Result<(), ProjectError> {
        self.write_json(
            WORKFLOW_FILE,
            &StoredWorkflow {
                protocols: graph.nodes.clone(),
                summary: graph.summary.clone(),
            },
        )?;
        self.write_json(LABELS_FILE, &graph.labels)?;
        tracing::debug!(
            project = %self.name,
            protocols = graph.nodes.len(),
            "project files written"
        );
        Ok(())
    }

    pub fn load_labels(&self) -> Result<LabelRegistry, ProjectError> {
        self.read_json(LABELS_FILE)
    }

    /// Read the stored graph back and validate it.
    pub fn load_graph(&self) -> Result<WorkflowGraph, ProjectError> {
        let stored: StoredWorkflow = self.read_json(WORKFLOW_FILE)?;
        let graph = WorkflowGraph {
            nodes: stored.protocols,
            labels: self.load_labels()?,
            summary: stored.summary,
        };
        graph.validate()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, ProtocolClass, Stage};
    use tempfile::TempDir;

    fn small_graph() -> WorkflowGraph {
        let mut b = GraphBuilder::new();
        let import = b
            .add(ProtocolClass::ImportMovies, "import movies", Stage::Movies)
            .param("dataStreaming", true)
            .summary()
            .id();
        b.add(ProtocolClass::MovieGain, "Xmipp - movie gain", Stage::Movies)
            .input("inputMovies", import.port("outputMovies"))
            .unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn create_refuses_an_existing_project() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "20190314_mySelf_myProtein").unwrap();
        assert!(store.path().is_dir());
        assert!(matches!(
            ProjectStore::create(tmp.path(), "20190314_mySelf_myProtein"),
            Err(ProjectError::AlreadyExists(_))
        ));
    }

    #[test]
    fn persisted_graph_loads_back() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(&tmp.path().join("projects"), "p1").unwrap();
        let graph = small_graph();
        store.persist(&graph).unwrap();
        assert!(store.file(WORKFLOW_FILE).is_file());
        assert!(store.file(LABELS_FILE).is_file());

        let opened = ProjectStore::open(&tmp.path().join("projects"), "p1").unwrap();
        let loaded = opened.load_graph().unwrap();
        assert_eq!(loaded.nodes, graph.nodes);
        assert_eq!(loaded.summary, graph.summary);
        assert_eq!(loaded.labels.get("Movies").unwrap().nodes, vec![NodeId(1), NodeId(2)]);
    }

    #[test]
    fn stored_classes_use_framework_names() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        store.persist(&small_graph()).unwrap();
        let text = fs::read_to_string(store.file(WORKFLOW_FILE)).unwrap();
        assert!(text.contains("\"ProtImportMovies\""));
    }

    #[test]
    fn open_missing_project_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            ProjectStore::open(tmp.path(), "nope"),
            Err(ProjectError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn open_resolves_symlinked_projects() {
        let tmp = TempDir::new().unwrap();
        let real = ProjectStore::create(&tmp.path().join("scratch"), "p1").unwrap();
        let projects = tmp.path().join("projects");
        fs::create_dir_all(&projects).unwrap();
        std::os::unix::fs::symlink(real.path(), projects.join("p1")).unwrap();

        let opened = ProjectStore::open(&projects, "p1").unwrap();
        assert_eq!(opened.path(), fs::canonicalize(real.path()).unwrap());
    }

    #[test]
    fn tampered_workflow_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        let mut graph = small_graph();
        graph.nodes[0].prerequisites.push(NodeId(2));
        store.persist(&graph).unwrap();
        assert!(matches!(store.load_graph(), Err(ProjectError::Graph(_))));
    }
}
