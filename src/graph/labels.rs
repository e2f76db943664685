// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage labels and their colors.
//!
//! Labels are kept in the order they are first used. The first nine take the
//! fixed palette, later ones a random color from an RNG seeded with a constant,
//! so two builds of the same workflow color the project the same way.

use crate::graph::node::NodeId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const LABEL_PALETTE: [&str; 9] = [
    "#e57373", "#4fc3f7", "#81c784", "#ff8a65", "#9575cd", "#a1887f", "#ffd54f", "#dce775",
    "#4db6ac",
];
const COLOR_SEED: u64 = 6;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub color: String,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRegistry {
    labels: Vec<LabelEntry>,
    #[serde(skip, default = "seeded_rng")]
    rng: StdRng,
}

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(COLOR_SEED)
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for LabelRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            rng: seeded_rng(),
        }
    }

    /// Tag `node` with `name`, creating the label on first use.
    ///
    /// An explicit color only matters when the label is new.
    pub fn apply(&mut self, name: &str, node: NodeId, color: Option<&str>) {
        if let Some(entry) = self.labels.iter_mut().find(|l| l.name == name) {
            if !entry.nodes.contains(&node) {
                entry.nodes.push(node);
            }
            return;
        }
        let color = match color {
            Some(color) => color.to_string(),
            None => self.next_color(),
        };
        self.labels.push(LabelEntry {
            name: name.to_string(),
            color,
            nodes: vec![node],
        });
    }

    fn next_color(&mut self) -> String {
        if let Some(color) = LABEL_PALETTE.get(self.labels.len()) {
            return color.to_string();
        }
        let digits: String = (0..6)
            .map(|_| HEX_DIGITS[self.rng.gen_range(0..HEX_DIGITS.len())] as char)
            .collect();
        format!("#{}", digits)
    }

    pub fn get(&self, name: &str) -> Option<&LabelEntry> {
        self.labels.iter().find(|l| l.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelEntry> {
        self.labels.iter()
    }

    /// First label carrying `node`.
    pub fn label_of(&self, node: NodeId) -> Option<&LabelEntry> {
        self.labels.iter().find(|l| l.nodes.contains(&node))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_assigned_in_order_of_first_use() {
        let mut registry = LabelRegistry::new();
        registry.apply("Movies", NodeId(1), None);
        registry.apply("CTF", NodeId(2), None);
        registry.apply("Movies", NodeId(3), None);

        let movies = registry.get("Movies").unwrap();
        assert_eq!(movies.color, "#e57373");
        assert_eq!(movies.nodes, vec![NodeId(1), NodeId(3)]);
        assert_eq!(registry.get("CTF").unwrap().color, "#4fc3f7");
    }

    #[test]
    fn explicit_color_still_counts_toward_palette_position() {
        let mut registry = LabelRegistry::new();
        registry.apply("Movies", NodeId(1), None);
        registry.apply("useful_OUTPUTs", NodeId(2), Some("#00ff00"));
        registry.apply("CTF", NodeId(3), None);

        assert_eq!(registry.get("useful_OUTPUTs").unwrap().color, "#00ff00");
        // the palette is indexed by how many labels exist
        assert_eq!(registry.get("CTF").unwrap().color, LABEL_PALETTE[2]);
    }

    #[test]
    fn colors_after_palette_are_seeded() {
        let build = || {
            let mut registry = LabelRegistry::new();
            for i in 0..12 {
                registry.apply(&format!("label{}", i), NodeId(i), None);
            }
            registry
        };
        let first = build();
        let second = build();
        assert_eq!(first, second);

        let tenth = &first.get("label9").unwrap().color;
        assert_eq!(tenth.len(), 7);
        assert!(tenth.starts_with('#'));
        assert!(tenth[1..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first.get("label8").unwrap().color, "#4db6ac");
    }

    #[test]
    fn label_of_finds_node() {
        let mut registry = LabelRegistry::new();
        registry.apply("Picking", NodeId(10), None);
        assert_eq!(registry.label_of(NodeId(10)).unwrap().name, "Picking");
        assert!(registry.label_of(NodeId(11)).is_none());
    }
}
