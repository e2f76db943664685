// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Project view settings: label definitions and the per-protocol labels the
//! framework uses to color the workflow.

use crate::errors::ProjectError;
use crate::graph::NodeId;
use crate::observability::messages::project::LabelsApplied;
use crate::observability::messages::StructuredLog;
use crate::project::store::{io_error, ProjectStore, SETTINGS_FILE};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Status,
    Labels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDefinition {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabels {
    pub id: NodeId,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    pub color_mode: ColorMode,
    pub labels: Vec<LabelDefinition>,
    pub nodes: Vec<NodeLabels>,
}

impl ViewSettings {
    /// Define `name`, or recolor it if already defined.
    fn define(&mut self, name: &str, color: &str) {
        match self.labels.iter_mut().find(|l| l.name == name) {
            Some(existing) => existing.color = color.to_string(),
            None => self.labels.push(LabelDefinition {
                name: name.to_string(),
                color: color.to_string(),
            }),
        }
    }

    /// Replace the labels of `id` with `name` alone.
    fn set_label(&mut self, id: NodeId, name: &str) {
        let labels = vec![name.to_string()];
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => node.labels = labels,
            None => self.nodes.push(NodeLabels { id, labels }),
        }
    }

    pub fn labels_of(&self, id: NodeId) -> Option<&[String]> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.labels.as_slice())
    }
}

/// Replay the stored label registry into the project's view settings and
/// switch the view to label coloring.
///
/// Existing settings are updated in place, other labels they hold are kept.
pub fn apply_labels(store: &ProjectStore) -> Result<ViewSettings, ProjectError> {
    let registry = store.load_labels()?;
    let path = store.file(SETTINGS_FILE);

    let mut settings: ViewSettings = if path.is_file() {
        let text = fs::read_to_string(&path).map_err(io_error(&path))?;
        serde_json::from_str(&text)?
    } else {
        ViewSettings::default()
    };

    let mut node_count = 0;
    for entry in registry.iter() {
        settings.define(&entry.name, &entry.color);
        for &id in &entry.nodes {
            settings.set_label(id, &entry.name);
            node_count += 1;
        }
    }
    settings.color_mode = ColorMode::Labels;

    let json = serde_json::to_string_pretty(&settings)?;
    fs::write(&path, json).map_err(io_error(&path))?;

    LabelsApplied {
        label_count: registry.len(),
        node_count,
    }
    .log();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, ProtocolClass, Stage, WorkflowGraph, LABEL_PALETTE};
    use tempfile::TempDir;

    fn labelled_graph() -> WorkflowGraph {
        let mut b = GraphBuilder::new();
        let import = b
            .add(ProtocolClass::ImportMovies, "import movies", Stage::Movies)
            .id();
        let gain = b
            .add(ProtocolClass::MovieGain, "Xmipp - movie gain", Stage::Movies)
            .input("inputMovies", import.port("outputMovies"))
            .unwrap()
            .id();
        let aligned = b
            .add(ProtocolClass::MotionCorr, "MotionCorr aligning", Stage::Movies)
            .input("inputMovies", gain.port("outputMovies"))
            .unwrap()
            .id();
        b.add(ProtocolClass::CtfFind, "GrigorieffLab - CTFfind", Stage::Ctf)
            .input("inputMicrographs", aligned.port("outputMicrographs"))
            .unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn labels_are_written_to_settings() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        store.persist(&labelled_graph()).unwrap();

        let settings = apply_labels(&store).unwrap();
        assert_eq!(settings.color_mode, ColorMode::Labels);
        assert_eq!(settings.labels.len(), 2);
        assert_eq!(settings.labels[0].name, "Movies");
        assert_eq!(settings.labels[0].color, LABEL_PALETTE[0]);
        assert_eq!(
            settings.labels_of(NodeId(4)),
            Some(&["CTF".to_string()][..])
        );

        let text = fs::read_to_string(store.file(SETTINGS_FILE)).unwrap();
        assert!(text.contains("\"colorMode\": \"labels\""));
    }

    #[test]
    fn existing_settings_are_updated_in_place() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        store.persist(&labelled_graph()).unwrap();

        let previous = ViewSettings {
            color_mode: ColorMode::Status,
            labels: vec![
                LabelDefinition {
                    name: "mine".into(),
                    color: "#000000".into(),
                },
                LabelDefinition {
                    name: "Movies".into(),
                    color: "#ffffff".into(),
                },
            ],
            nodes: vec![NodeLabels {
                id: NodeId(1),
                labels: vec!["mine".into()],
            }],
        };
        fs::write(
            store.file(SETTINGS_FILE),
            serde_json::to_string(&previous).unwrap(),
        )
        .unwrap();

        let settings = apply_labels(&store).unwrap();
        assert_eq!(settings.labels.len(), 3);
        assert_eq!(settings.labels[0].name, "mine");
        assert_eq!(settings.labels[1].color, LABEL_PALETTE[0]);
        assert_eq!(
            settings.labels_of(NodeId(1)),
            Some(&["Movies".to_string()][..])
        );
    }

    #[test]
    fn applying_twice_is_stable() {
        let tmp = TempDir::new().unwrap();
        let store = ProjectStore::create(tmp.path(), "p1").unwrap();
        store.persist(&labelled_graph()).unwrap();
        let first = apply_labels(&store).unwrap();
        let second = apply_labels(&store).unwrap();
        assert_eq!(first, second);
    }
}
