//! Circuit documents as authored in the card editor.
//!
//! A document is an ordered stack of cards. Field names follow the editor's
//! JSON (`matrixConnections`, `meshInteractionPoints`, `logicGates`), with the
//! shorter `connections` / `meshPoints` accepted as aliases. Anything the
//! cipher does not consume (descriptions, card heights, node wiring) is
//! ignored on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const DEFAULT_TARGET_COORD: f64 = 0.5;

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("invalid circuit document: {0}")]
    Validation(String),

    #[error("invalid cipher parameters: {0}")]
    Parameters(String),

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitDocument {
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(rename = "matrixConnections", alias = "connections", default)]
    pub connections: Vec<Connection>,
    #[serde(rename = "meshInteractionPoints", alias = "meshPoints", default)]
    pub mesh_points: Vec<MeshPoint>,
    #[serde(default)]
    pub logic_gates: Vec<LogicGate>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// A wire drawn on a matrix card. Only active wires reach the cipher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub from_x: f64,
    #[serde(default)]
    pub from_y: f64,
    #[serde(default = "default_target_coord")]
    pub to_x: f64,
    #[serde(default = "default_target_coord")]
    pub to_y: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshPoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub up_connections: Vec<String>,
    #[serde(default)]
    pub down_connections: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicGate {
    #[serde(default)]
    pub id: String,
    /// Raw gate label. Unknown labels behave as a buffer but still feed the seed.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

fn default_target_coord() -> f64 {
    DEFAULT_TARGET_COORD
}

impl Connection {
    pub fn new(from: (f64, f64), to: (f64, f64)) -> Self {
        Self {
            id: None,
            active: true,
            from_x: from.0,
            from_y: from.1,
            to_x: to.0,
            to_y: to.1,
        }
    }
}

impl Card {
    /// Card id, or `unknown-{index}` when the editor left it blank.
    pub fn card_id(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("unknown-{index}"),
        }
    }
}

impl CircuitDocument {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn from_json_str(text: &str) -> Result<Self, CircuitError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| CircuitError::Validation(format!("malformed JSON: {err}")))?;
        Self::from_json_value(value)
    }

    /// Checks the document shape before handing it to serde so callers get
    /// the same message for "no cards" regardless of what else is wrong.
    pub fn from_json_value(value: Value) -> Result<Self, CircuitError> {
        match value.get("cards") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(CircuitError::Validation(
                    "`cards` must be an array".to_string(),
                ));
            }
            None => {
                return Err(CircuitError::Validation(
                    "missing required circuit data".to_string(),
                ));
            }
        }
        serde_json::from_value(value).map_err(|err| CircuitError::Validation(err.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, CircuitError> {
        let text = fs::read_to_string(path).map_err(|source| CircuitError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_cards_rejected() {
        let err = CircuitDocument::from_json_value(json!({ "signals": [] })).unwrap_err();
        assert!(matches!(err, CircuitError::Validation(msg) if msg.contains("missing")));

        let err = CircuitDocument::from_json_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CircuitError::Validation(_)));
    }

    #[test]
    fn cards_must_be_array() {
        let err = CircuitDocument::from_json_value(json!({ "cards": {} })).unwrap_err();
        assert!(matches!(err, CircuitError::Validation(msg) if msg.contains("array")));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = CircuitDocument::from_json_str("{ cards: ").unwrap_err();
        assert!(matches!(err, CircuitError::Validation(_)));
    }

    #[test]
    fn empty_stack_is_valid() {
        let doc = CircuitDocument::from_json_str(r#"{"cards": []}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn editor_field_names_and_defaults() {
        let doc = CircuitDocument::from_json_value(json!({
            "cards": [{
                "type": "matrix",
                "color": "#a56b4a",
                "description": "ignored",
                "height": 0.15,
                "nodes": [{ "id": "in1", "x": 0.1, "y": 0.2, "type": "input", "connections": [] }],
                "matrixConnections": [{ "active": true, "fromX": 0.3 }],
                "meshInteractionPoints": [{ "id": "m", "x": 0.5, "y": 0.5, "upConnections": ["n"] }],
                "logicGates": [{ "id": "g", "type": "XOR", "inputs": [], "outputs": [] }]
            }]
        }))
        .unwrap();
        let card = &doc.cards[0];
        assert_eq!(card.card_id(3), "unknown-3");
        assert_eq!(card.kind.as_deref(), Some("matrix"));
        let conn = &card.connections[0];
        assert!(conn.active);
        assert_eq!(conn.from_x, 0.3);
        assert_eq!(conn.from_y, 0.0);
        assert_eq!(conn.to_x, 0.5);
        assert_eq!(conn.to_y, 0.5);
        assert_eq!(card.mesh_points[0].up_connections, vec!["n".to_string()]);
        assert!(card.mesh_points[0].down_connections.is_empty());
        assert_eq!(card.logic_gates[0].kind.as_deref(), Some("XOR"));
    }

    #[test]
    fn short_aliases_accepted() {
        let doc = CircuitDocument::from_json_value(json!({
            "cards": [{
                "id": "c",
                "connections": [{ "active": false, "fromX": 0.1, "fromY": 0.1, "toX": 0.2, "toY": 0.2 }],
                "meshPoints": [{ "id": "m" }]
            }]
        }))
        .unwrap();
        assert_eq!(doc.cards[0].card_id(0), "c");
        assert_eq!(doc.cards[0].connections.len(), 1);
        assert!(!doc.cards[0].connections[0].active);
        assert_eq!(doc.cards[0].mesh_points.len(), 1);
    }

    #[test]
    fn bad_field_type_is_validation_error() {
        let err = CircuitDocument::from_json_value(json!({
            "cards": [{ "nodes": "not-a-list" }]
        }))
        .unwrap_err();
        assert!(matches!(err, CircuitError::Validation(_)));
    }
}
