use serde::{Deserialize, Serialize};

/// Byte-level operation contributed by a logic gate.
///
/// Every operation is a function of two bytes; unary gates ignore `b2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Not,
    Nand,
    Nor,
    Buffer,
    /// Rotates the running value left by one bit. Only used by the
    /// gate-less default pipeline.
    RotateLeft,
}

/// Pipeline used when a circuit has no logic gates at all.
pub const DEFAULT_PIPELINE: [LogicOp; 2] = [LogicOp::Xor, LogicOp::RotateLeft];

impl LogicOp {
    /// Maps an editor gate label to its operation. Labels are case-sensitive;
    /// anything unrecognised (or missing) acts as a buffer.
    pub fn from_gate_type(label: Option<&str>) -> Self {
        match label {
            Some("AND") => LogicOp::And,
            Some("OR") => LogicOp::Or,
            Some("XOR") => LogicOp::Xor,
            Some("NOT") => LogicOp::Not,
            Some("NAND") => LogicOp::Nand,
            Some("NOR") => LogicOp::Nor,
            _ => LogicOp::Buffer,
        }
    }

    #[inline]
    pub fn apply(self, b1: u8, b2: u8) -> u8 {
        match self {
            LogicOp::And => b1 & b2,
            LogicOp::Or => b1 | b2,
            LogicOp::Xor => b1 ^ b2,
            LogicOp::Not => !b1,
            LogicOp::Nand => !(b1 & b2),
            LogicOp::Nor => !(b1 | b2),
            LogicOp::Buffer => b1,
            LogicOp::RotateLeft => b1.rotate_left(1),
        }
    }
}

/// Ordered operation list for a circuit's gates, falling back to
/// [`DEFAULT_PIPELINE`] when there are none.
pub fn ops_for_gates<'a, I>(gate_types: I) -> Vec<LogicOp>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let ops: Vec<LogicOp> = gate_types
        .into_iter()
        .map(LogicOp::from_gate_type)
        .collect();
    if ops.is_empty() {
        DEFAULT_PIPELINE.to_vec()
    } else {
        ops
    }
}
