use log::debug;
use serde::Serialize;

use crate::document::{CircuitDocument, Connection, LogicGate, MeshPoint, Node};
use crate::summary::CircuitSummary;

/// An element of a card, tagged with the card it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tagged<'a, T> {
    pub card_id: String,
    pub card_index: usize,
    #[serde(flatten)]
    pub item: &'a T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshDirection {
    Up,
    Down,
}

/// Directed link between two mesh points on different cards. `from` and `to`
/// index into [`CircuitGraph::mesh_points`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MeshEdge {
    pub from: usize,
    pub to: usize,
    pub direction: MeshDirection,
}

/// Flattened view of every card in a document.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CircuitGraph<'a> {
    pub nodes: Vec<Tagged<'a, Node>>,
    /// Active connections only.
    pub connections: Vec<Tagged<'a, Connection>>,
    pub mesh_points: Vec<Tagged<'a, MeshPoint>>,
    pub logic_gates: Vec<Tagged<'a, LogicGate>>,
    pub mesh_edges: Vec<MeshEdge>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CircuitAnalysis<'a> {
    pub graph: CircuitGraph<'a>,
    pub summary: CircuitSummary,
}

impl<'a, T> Tagged<'a, T> {
    fn new(card_id: &str, card_index: usize, item: &'a T) -> Self {
        Self {
            card_id: card_id.to_string(),
            card_index,
            item,
        }
    }
}

impl<'a> CircuitGraph<'a> {
    /// Walks the stack bottom to top and flattens each card's elements.
    pub fn extract(document: &'a CircuitDocument) -> Self {
        let mut graph = CircuitGraph::default();
        for (index, card) in document.cards.iter().enumerate() {
            let card_id = card.card_id(index);
            graph.nodes.extend(
                card.nodes
                    .iter()
                    .map(|node| Tagged::new(&card_id, index, node)),
            );
            graph.connections.extend(
                card.connections
                    .iter()
                    .filter(|conn| conn.active)
                    .map(|conn| Tagged::new(&card_id, index, conn)),
            );
            graph.mesh_points.extend(
                card.mesh_points
                    .iter()
                    .map(|point| Tagged::new(&card_id, index, point)),
            );
            graph.logic_gates.extend(
                card.logic_gates
                    .iter()
                    .map(|gate| Tagged::new(&card_id, index, gate)),
            );
        }
        graph.mesh_edges = resolve_mesh_edges(&graph.mesh_points);
        graph
    }

    pub fn edge_endpoints(
        &self,
        edge: &MeshEdge,
    ) -> (&Tagged<'a, MeshPoint>, &Tagged<'a, MeshPoint>) {
        (&self.mesh_points[edge.from], &self.mesh_points[edge.to])
    }
}

/// Resolves declared up/down links into edges. An `up` link only lands on a
/// point with the target id on a higher card, a `down` link on a lower card.
/// Every matching point yields its own edge; unmatched ids yield nothing.
pub fn resolve_mesh_edges(points: &[Tagged<'_, MeshPoint>]) -> Vec<MeshEdge> {
    let mut edges = Vec::new();
    for (from, point) in points.iter().enumerate() {
        for target in &point.item.up_connections {
            edges.extend(
                points
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| {
                        candidate.item.id == *target && candidate.card_index > point.card_index
                    })
                    .map(|(to, _)| MeshEdge {
                        from,
                        to,
                        direction: MeshDirection::Up,
                    }),
            );
        }
        for target in &point.item.down_connections {
            edges.extend(
                points
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| {
                        candidate.item.id == *target && candidate.card_index < point.card_index
                    })
                    .map(|(to, _)| MeshEdge {
                        from,
                        to,
                        direction: MeshDirection::Down,
                    }),
            );
        }
    }
    edges
}

pub fn analyze_circuit(document: &CircuitDocument) -> CircuitAnalysis<'_> {
    let graph = CircuitGraph::extract(document);
    let summary = CircuitSummary::from_graph(document, &graph);
    debug!(
        "analyzed circuit cards={} nodes={} active_connections={} mesh_points={} mesh_edges={} gates={} complexity={}",
        summary.num_cards,
        summary.num_nodes,
        summary.num_connections,
        summary.num_mesh_points,
        summary.num_mesh_connections,
        summary.num_logic_gates,
        summary.complexity_score
    );
    CircuitAnalysis { graph, summary }
}
