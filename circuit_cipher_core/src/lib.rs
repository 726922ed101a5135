//! Circuit-derived cipher parameters and the circuit cipher engine.
//!
//! A circuit document (a stack of cards with nodes, wires, mesh links and
//! logic gates) is analysed into a graph, scored, and mapped onto a
//! [`CipherParameters`] set that drives [`CircuitCipher`]. The cipher is an
//! experiment and provides no authentication; do not use it to protect
//! real data.

pub mod cipher;
pub mod document;
pub mod graph;
pub mod logic;
pub mod params;
pub mod preset;
pub mod rng;
pub mod session;
pub mod summary;
pub mod versioning;

pub use crate::cipher::{CipherError, CircuitCipher};
pub use crate::document::{
    Card, CircuitDocument, CircuitError, Connection, LogicGate, MeshPoint, Node,
};
pub use crate::graph::{CircuitAnalysis, CircuitGraph, MeshDirection, MeshEdge, analyze_circuit};
pub use crate::logic::LogicOp;
pub use crate::params::{CipherParameters, derive_parameters};
pub use crate::preset::{CardPreset, default_cards, preset_card, stack_from_presets};
pub use crate::rng::{SecureRng, deterministic_rng, secure_rng};
pub use crate::session::{CircuitSession, SessionError};
pub use crate::summary::CircuitSummary;
pub use crate::versioning::*;
