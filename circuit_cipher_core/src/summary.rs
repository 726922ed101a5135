use serde::{Deserialize, Serialize};

use crate::document::CircuitDocument;
use crate::graph::CircuitGraph;

pub const CARD_WEIGHT: usize = 5;
pub const CONNECTION_WEIGHT: usize = 2;
pub const MESH_EDGE_WEIGHT: usize = 3;
pub const GATE_WEIGHT: usize = 4;

/// Counts and labels describing a circuit, in document order.
///
/// Missing card types, colors, or gate types are recorded as empty strings so
/// the lists stay aligned with the cards and gates they describe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub num_cards: usize,
    pub card_types: Vec<String>,
    pub card_colors: Vec<String>,
    pub num_nodes: usize,
    /// Active connections only.
    pub num_connections: usize,
    pub num_mesh_points: usize,
    pub num_mesh_connections: usize,
    pub num_logic_gates: usize,
    pub logic_gate_types: Vec<String>,
    pub complexity_score: usize,
}

impl CircuitSummary {
    pub fn from_graph(document: &CircuitDocument, graph: &CircuitGraph<'_>) -> Self {
        let num_cards = document.cards.len();
        Self {
            num_cards,
            card_types: document
                .cards
                .iter()
                .map(|card| card.kind.clone().unwrap_or_default())
                .collect(),
            card_colors: document
                .cards
                .iter()
                .map(|card| card.color.clone().unwrap_or_default())
                .collect(),
            num_nodes: graph.nodes.len(),
            num_connections: graph.connections.len(),
            num_mesh_points: graph.mesh_points.len(),
            num_mesh_connections: graph.mesh_edges.len(),
            num_logic_gates: graph.logic_gates.len(),
            logic_gate_types: graph
                .logic_gates
                .iter()
                .map(|gate| gate.item.kind.clone().unwrap_or_default())
                .collect(),
            complexity_score: complexity_score(
                num_cards,
                graph.connections.len(),
                graph.mesh_edges.len(),
                graph.logic_gates.len(),
            ),
        }
    }

    /// Card types, then card colors, then gate types, with no separators.
    pub fn seed_material(&self) -> String {
        self.card_types
            .iter()
            .chain(&self.card_colors)
            .chain(&self.logic_gate_types)
            .map(String::as_str)
            .collect()
    }
}

pub fn complexity_score(
    cards: usize,
    active_connections: usize,
    mesh_edges: usize,
    logic_gates: usize,
) -> usize {
    cards * CARD_WEIGHT
        + active_connections * CONNECTION_WEIGHT
        + mesh_edges * MESH_EDGE_WEIGHT
        + logic_gates * GATE_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::analyze_circuit;
    use serde_json::json;

    #[test]
    fn weights() {
        assert_eq!(complexity_score(0, 0, 0, 0), 0);
        assert_eq!(complexity_score(1, 0, 0, 0), 5);
        assert_eq!(complexity_score(0, 1, 0, 0), 2);
        assert_eq!(complexity_score(0, 0, 1, 0), 3);
        assert_eq!(complexity_score(0, 0, 0, 1), 4);
        assert_eq!(complexity_score(3, 4, 2, 5), 15 + 8 + 6 + 20);
    }

    #[test]
    fn labels_follow_document_order() {
        let doc = CircuitDocument::from_json_value(json!({
            "cards": [
                { "type": "logic", "color": "red", "logicGates": [{ "type": "AND" }, { "type": "NOT" }] },
                { "color": "blue", "logicGates": [{ "id": "untyped" }] },
                { "type": "matrix", "logicGates": [{ "type": "XOR" }] }
            ]
        }))
        .unwrap();
        let summary = analyze_circuit(&doc).summary;
        assert_eq!(summary.card_types, vec!["logic", "", "matrix"]);
        assert_eq!(summary.card_colors, vec!["red", "blue", ""]);
        assert_eq!(summary.logic_gate_types, vec!["AND", "NOT", "", "XOR"]);
        assert_eq!(summary.seed_material(), "logicmatrixredblueANDNOTXOR");
        assert_eq!(summary.complexity_score, 3 * 5 + 4 * 4);
    }
}
