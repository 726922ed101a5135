//! Built-in card library.
//!
//! These are the four cards the editor ships with. Stacking them gives a
//! reproducible circuit without needing a document on disk.

use std::fmt;
use std::str::FromStr;

use crate::document::{Card, CircuitDocument, CircuitError, Connection, LogicGate, MeshPoint, Node};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardPreset {
    AndGate,
    Matrix,
    Hybrid,
    MeshConnector,
}

impl CardPreset {
    pub const ALL: [CardPreset; 4] = [
        CardPreset::AndGate,
        CardPreset::Matrix,
        CardPreset::Hybrid,
        CardPreset::MeshConnector,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CardPreset::AndGate => "and-gate",
            CardPreset::Matrix => "matrix-basic",
            CardPreset::Hybrid => "hybrid-basic",
            CardPreset::MeshConnector => "mesh-connector",
        }
    }
}

impl fmt::Display for CardPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CardPreset {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardPreset::ALL
            .into_iter()
            .find(|preset| preset.id() == s)
            .ok_or_else(|| {
                CircuitError::Validation(format!(
                    "unknown card preset {s:?} (expected one of and-gate, matrix-basic, hybrid-basic, mesh-connector)"
                ))
            })
    }
}

fn node(id: &str, x: f64, y: f64) -> Node {
    Node {
        id: id.to_string(),
        x,
        y,
    }
}

fn mesh(id: &str, x: f64, y: f64, up: &[&str], down: &[&str]) -> MeshPoint {
    MeshPoint {
        id: id.to_string(),
        x,
        y,
        up_connections: up.iter().map(|s| s.to_string()).collect(),
        down_connections: down.iter().map(|s| s.to_string()).collect(),
    }
}

fn gate(id: &str, kind: &str, x: f64, y: f64) -> LogicGate {
    LogicGate {
        id: id.to_string(),
        kind: Some(kind.to_string()),
        x,
        y,
    }
}

fn card(preset: CardPreset, name: &str, color: &str, kind: &str) -> Card {
    Card {
        id: Some(preset.id().to_string()),
        kind: Some(kind.to_string()),
        color: Some(color.to_string()),
        name: Some(name.to_string()),
        ..Card::default()
    }
}

pub fn preset_card(preset: CardPreset) -> Card {
    match preset {
        CardPreset::AndGate => Card {
            nodes: vec![
                node("in1", 0.2, 0.3),
                node("in2", 0.2, 0.7),
                node("out", 0.8, 0.5),
            ],
            logic_gates: vec![gate("gate1", "AND", 0.5, 0.5)],
            mesh_points: vec![
                mesh("mesh1", 0.2, 0.3, &[], &[]),
                mesh("mesh2", 0.2, 0.7, &[], &[]),
                mesh("mesh3", 0.8, 0.5, &[], &[]),
            ],
            ..card(preset, "AND Gate", "#4a6fa5", "logic")
        },
        CardPreset::Matrix => Card {
            nodes: vec![
                node("in1", 0.1, 0.2),
                node("in2", 0.1, 0.4),
                node("in3", 0.1, 0.6),
                node("in4", 0.1, 0.8),
                node("out1", 0.9, 0.2),
                node("out2", 0.9, 0.4),
                node("out3", 0.9, 0.6),
                node("out4", 0.9, 0.8),
            ],
            connections: vec![
                Connection::new((0.1, 0.2), (0.9, 0.8)),
                Connection::new((0.1, 0.4), (0.9, 0.6)),
                Connection::new((0.1, 0.6), (0.9, 0.4)),
                Connection::new((0.1, 0.8), (0.9, 0.2)),
            ],
            mesh_points: vec![
                mesh("mesh1", 0.3, 0.3, &[], &[]),
                mesh("mesh2", 0.3, 0.7, &[], &[]),
                mesh("mesh3", 0.7, 0.3, &[], &[]),
                mesh("mesh4", 0.7, 0.7, &[], &[]),
            ],
            ..card(preset, "Matrix Card", "#a56b4a", "matrix")
        },
        CardPreset::Hybrid => Card {
            nodes: vec![
                node("in1", 0.1, 0.3),
                node("in2", 0.1, 0.7),
                node("mid", 0.5, 0.5),
                node("out1", 0.9, 0.3),
                node("out2", 0.9, 0.7),
            ],
            logic_gates: vec![gate("gate1", "AND", 0.3, 0.5)],
            connections: vec![
                Connection::new((0.5, 0.5), (0.9, 0.3)),
                Connection::new((0.5, 0.5), (0.9, 0.7)),
            ],
            mesh_points: vec![
                mesh("mesh1", 0.1, 0.3, &[], &[]),
                mesh("mesh2", 0.1, 0.7, &[], &[]),
                mesh("mesh3", 0.5, 0.5, &[], &[]),
                mesh("mesh4", 0.9, 0.3, &[], &[]),
                mesh("mesh5", 0.9, 0.7, &[], &[]),
            ],
            ..card(preset, "Hybrid Card", "#6aa54a", "hybrid")
        },
        CardPreset::MeshConnector => Card {
            nodes: vec![
                node("in1", 0.2, 0.2),
                node("in2", 0.2, 0.8),
                node("out1", 0.8, 0.2),
                node("out2", 0.8, 0.8),
            ],
            connections: vec![
                Connection::new((0.2, 0.2), (0.8, 0.2)),
                Connection::new((0.2, 0.8), (0.8, 0.8)),
            ],
            mesh_points: vec![
                mesh("mesh1", 0.2, 0.2, &["mesh3"], &["mesh3"]),
                mesh("mesh2", 0.2, 0.8, &["mesh4"], &["mesh4"]),
                mesh("mesh3", 0.8, 0.2, &["mesh1"], &["mesh1"]),
                mesh("mesh4", 0.8, 0.8, &["mesh2"], &["mesh2"]),
            ],
            ..card(preset, "Mesh Connector", "#8a4aa5", "matrix")
        },
    }
}

/// The full library in editor order.
pub fn default_cards() -> Vec<Card> {
    CardPreset::ALL.into_iter().map(preset_card).collect()
}

/// Stacks presets bottom to top. Each stacked card gets a unique
/// `{preset}-{position}` id.
pub fn stack_from_presets(presets: &[CardPreset]) -> CircuitDocument {
    let cards = presets
        .iter()
        .enumerate()
        .map(|(position, preset)| Card {
            id: Some(format!("{}-{position}", preset.id())),
            ..preset_card(*preset)
        })
        .collect();
    CircuitDocument::new(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::analyze_circuit;
    use crate::params::derive_parameters;

    #[test]
    fn preset_ids_parse_back() {
        for preset in CardPreset::ALL {
            assert_eq!(preset.id().parse::<CardPreset>().unwrap(), preset);
            assert_eq!(preset.to_string(), preset.id());
        }
        assert!(matches!(
            "nand-gate".parse::<CardPreset>(),
            Err(CircuitError::Validation(_))
        ));
    }

    #[test]
    fn library_contents() {
        let cards = default_cards();
        assert_eq!(cards.len(), 4);
        let doc = CircuitDocument::new(cards);
        let summary = analyze_circuit(&doc).summary;
        assert_eq!(summary.card_types, vec!["logic", "matrix", "hybrid", "matrix"]);
        assert_eq!(summary.num_nodes, 3 + 8 + 5 + 4);
        assert_eq!(summary.num_connections, 4 + 2 + 2);
        assert_eq!(summary.num_mesh_points, 3 + 4 + 5 + 4);
        assert_eq!(summary.num_logic_gates, 2);
        assert_eq!(summary.logic_gate_types, vec!["AND", "AND"]);
    }

    #[test]
    fn mesh_connector_links_across_cards() {
        let alone = stack_from_presets(&[CardPreset::MeshConnector]);
        assert_eq!(analyze_circuit(&alone).summary.num_mesh_connections, 0);

        // connector points mesh1, mesh3 and mesh4 find mesh3, mesh1 and mesh2 on
        // the and-gate below; the and-gate has no mesh4 and declares no links.
        let doc = stack_from_presets(&[CardPreset::AndGate, CardPreset::MeshConnector]);
        let analysis = analyze_circuit(&doc);
        assert_eq!(analysis.summary.num_mesh_connections, 3);
        let ids: Vec<_> = doc.cards.iter().map(|c| c.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["and-gate-0", "mesh-connector-1"]);
    }

    #[test]
    fn full_stack_parameters() {
        let doc = stack_from_presets(&CardPreset::ALL);
        let params = derive_parameters(&analyze_circuit(&doc));
        assert_eq!(params.key_rounds(), 6);
        assert_eq!(params.matrix_size(), 10);
        assert_eq!(params.permutation_rounds(), 4);
    }
}
