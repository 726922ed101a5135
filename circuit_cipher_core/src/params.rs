use blake3::Hasher;
use log::debug;
use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::document::{CircuitError, Connection};
use crate::graph::{CircuitAnalysis, Tagged};
use crate::logic::{self, LogicOp};
use crate::versioning::{CIPHER_PARAMETERS_VERSION, expect_version};

pub const MIN_KEY_ROUNDS: usize = 2;
pub const MAX_KEY_ROUNDS: usize = 16;
pub const MIN_MATRIX_SIZE: usize = 4;
pub const MAX_MATRIX_SIZE: usize = 32;
pub const MIN_PERMUTATION_ROUNDS: usize = 1;
pub const MAX_PERMUTATION_ROUNDS: usize = 8;
pub const SEED_BYTES: usize = 8;
pub const SEED_HEX_CHARS: usize = SEED_BYTES * 2;

const COORD_SCALE: f64 = 100.0;

/// Numeric configuration of a [`CircuitCipher`](crate::cipher::CircuitCipher).
///
/// Derived values are clamped into range; values built with [`CipherParameters::new`]
/// or deserialized from JSON are validated against the same bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherParameters {
    version: u16,
    key_rounds: usize,
    permutation_rounds: usize,
    seed_hex: String,
    substitution_matrix: Vec<Vec<u8>>,
    logic_ops: Vec<LogicOp>,
}

impl CipherParameters {
    pub fn new(
        key_rounds: usize,
        permutation_rounds: usize,
        seed_hex: impl Into<String>,
        substitution_matrix: Vec<Vec<u8>>,
        logic_ops: Vec<LogicOp>,
    ) -> Result<Self, CircuitError> {
        let params = Self {
            version: CIPHER_PARAMETERS_VERSION,
            key_rounds,
            permutation_rounds,
            seed_hex: seed_hex.into(),
            substitution_matrix,
            logic_ops,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn key_rounds(&self) -> usize {
        self.key_rounds
    }

    pub fn matrix_size(&self) -> usize {
        self.substitution_matrix.len()
    }

    pub fn permutation_rounds(&self) -> usize {
        self.permutation_rounds
    }

    pub fn seed_hex(&self) -> &str {
        &self.seed_hex
    }

    pub fn substitution_matrix(&self) -> &[Vec<u8>] {
        &self.substitution_matrix
    }

    pub fn logic_ops(&self) -> &[LogicOp] {
        &self.logic_ops
    }

    /// Matrix cell addressed by byte position `index` in round `round`.
    #[inline]
    pub fn cell(&self, index: usize, round: usize) -> u8 {
        let size = self.substitution_matrix.len();
        self.substitution_matrix[index % size][(index + round) % size]
    }

    /// BLAKE3 digest identifying this parameter set, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Hasher::new();
        hasher.update(b"circuit-cipher::parameters");
        hasher.update(&self.version.to_le_bytes());
        hasher.update(&(self.key_rounds as u64).to_le_bytes());
        hasher.update(&(self.permutation_rounds as u64).to_le_bytes());
        hasher.update(self.seed_hex.as_bytes());
        hasher.update(&(self.matrix_size() as u64).to_le_bytes());
        for row in &self.substitution_matrix {
            hasher.update(row);
        }
        for op in &self.logic_ops {
            hasher.update(&[*op as u8]);
        }
        hasher.finalize().to_hex().to_string()
    }

    fn validate(&self) -> Result<(), CircuitError> {
        if !(MIN_KEY_ROUNDS..=MAX_KEY_ROUNDS).contains(&self.key_rounds) {
            return Err(CircuitError::Parameters(format!(
                "key_rounds {} outside {MIN_KEY_ROUNDS}..={MAX_KEY_ROUNDS}",
                self.key_rounds
            )));
        }
        if !(MIN_PERMUTATION_ROUNDS..=MAX_PERMUTATION_ROUNDS).contains(&self.permutation_rounds) {
            return Err(CircuitError::Parameters(format!(
                "permutation_rounds {} outside {MIN_PERMUTATION_ROUNDS}..={MAX_PERMUTATION_ROUNDS}",
                self.permutation_rounds
            )));
        }
        let size = self.substitution_matrix.len();
        if !(MIN_MATRIX_SIZE..=MAX_MATRIX_SIZE).contains(&size) {
            return Err(CircuitError::Parameters(format!(
                "matrix size {size} outside {MIN_MATRIX_SIZE}..={MAX_MATRIX_SIZE}"
            )));
        }
        if let Some(row) = self.substitution_matrix.iter().position(|r| r.len() != size) {
            return Err(CircuitError::Parameters(format!(
                "substitution matrix row {row} has {} cells, expected {size}",
                self.substitution_matrix[row].len()
            )));
        }
        if self.logic_ops.is_empty() {
            return Err(CircuitError::Parameters(
                "logic operation list is empty".to_string(),
            ));
        }
        if self.seed_hex.len() != SEED_HEX_CHARS
            || !self.seed_hex.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(CircuitError::Parameters(format!(
                "seed must be {SEED_HEX_CHARS} hex characters, got {:?}",
                self.seed_hex
            )));
        }
        Ok(())
    }
}

impl Serialize for CipherParameters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("CipherParameters", 7)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("key_rounds", &self.key_rounds)?;
        state.serialize_field("matrix_size", &self.matrix_size())?;
        state.serialize_field("permutation_rounds", &self.permutation_rounds)?;
        state.serialize_field("seed_hex", &self.seed_hex)?;
        state.serialize_field("substitution_matrix", &self.substitution_matrix)?;
        state.serialize_field("logic_ops", &self.logic_ops)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for CipherParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            version: u16,
            key_rounds: usize,
            matrix_size: usize,
            permutation_rounds: usize,
            seed_hex: String,
            substitution_matrix: Vec<Vec<u8>>,
            logic_ops: Vec<LogicOp>,
        }
        let helper = Helper::deserialize(deserializer)?;
        expect_version::<D::Error>(helper.version, CIPHER_PARAMETERS_VERSION, "CipherParameters")?;
        if helper.matrix_size != helper.substitution_matrix.len() {
            return Err(D::Error::custom(format!(
                "matrix_size {} does not match {} matrix rows",
                helper.matrix_size,
                helper.substitution_matrix.len()
            )));
        }
        CipherParameters::new(
            helper.key_rounds,
            helper.permutation_rounds,
            helper.seed_hex,
            helper.substitution_matrix,
            helper.logic_ops,
        )
        .map_err(D::Error::custom)
    }
}

/// Maps an analysed circuit onto cipher parameters. Never fails: every value
/// is clamped, so even an empty stack yields a usable set.
pub fn derive_parameters(analysis: &CircuitAnalysis<'_>) -> CipherParameters {
    let summary = &analysis.summary;
    let key_rounds = (summary.num_cards + 2).clamp(MIN_KEY_ROUNDS, MAX_KEY_ROUNDS);
    let matrix_size = (summary.num_nodes / 2).clamp(MIN_MATRIX_SIZE, MAX_MATRIX_SIZE);
    let permutation_rounds =
        (summary.num_connections / 2).clamp(MIN_PERMUTATION_ROUNDS, MAX_PERMUTATION_ROUNDS);
    let seed = circuit_seed(&summary.seed_material());
    let substitution_matrix = substitution_matrix(matrix_size, &analysis.graph.connections, &seed);
    let logic_ops = logic::ops_for_gates(
        analysis
            .graph
            .logic_gates
            .iter()
            .map(|gate| gate.item.kind.as_deref()),
    );
    debug!(
        "derived parameters key_rounds={} matrix_size={} permutation_rounds={} seed={} ops={}",
        key_rounds,
        matrix_size,
        permutation_rounds,
        hex::encode(seed),
        logic_ops.len()
    );
    CipherParameters {
        version: CIPHER_PARAMETERS_VERSION,
        key_rounds,
        permutation_rounds,
        seed_hex: hex::encode(seed),
        substitution_matrix,
        logic_ops,
    }
}

/// First eight bytes of SHA-256 over the seed material; hex-encoded they
/// are the circuit's 16-character seed.
pub fn circuit_seed(material: &str) -> [u8; SEED_BYTES] {
    let digest = Sha256::digest(material.as_bytes());
    let mut seed = [0u8; SEED_BYTES];
    seed.copy_from_slice(&digest[..SEED_BYTES]);
    seed
}

/// Lays active connections onto a `size`×`size` grid, later wires
/// overwriting earlier ones. When the circuit has fewer wires than rows,
/// rows left entirely empty are filled from the seed.
pub fn substitution_matrix(
    size: usize,
    connections: &[Tagged<'_, Connection>],
    seed: &[u8; SEED_BYTES],
) -> Vec<Vec<u8>> {
    let mut matrix = vec![vec![0u8; size]; size];
    for conn in connections {
        let wire = conn.item;
        let row = scaled(wire.from_x).rem_euclid(size as i64) as usize;
        let col = scaled(wire.from_y).rem_euclid(size as i64) as usize;
        let value = ((wire.to_x * COORD_SCALE + wire.to_y * COORD_SCALE) as i64).rem_euclid(256);
        matrix[row][col] = value as u8;
    }
    if connections.len() < size {
        for (row_index, row) in matrix.iter_mut().enumerate() {
            if row.iter().all(|&cell| cell == 0) {
                for (col, cell) in row.iter_mut().enumerate() {
                    *cell = seed[(row_index + col) % SEED_BYTES];
                }
            }
        }
    }
    matrix
}

// Truncates toward zero, matching how the editor's coordinates were always
// quantised.
fn scaled(coord: f64) -> i64 {
    (coord * COORD_SCALE) as i64
}
