// Errors raised by the solver core

use std::{error::Error, fmt};

/// A precondition violation inside the solver. None of these are
/// recoverable mid-run; the caller is expected to abort the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// Two fields that must share a shape do not.
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The grid is smaller than the operators can handle.
    GridTooSmall { rows: usize, cols: usize },

    /// A solver parameter is outside its valid range.
    InvalidParameter { name: &'static str, value: f32 },

    /// A field contains NaN or infinity.
    NonFinite { field: &'static str },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "{what} has shape {}x{}, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            SimError::GridTooSmall { rows, cols } => {
                write!(f, "grid {rows}x{cols} is too small (minimum is 4x4)")
            }
            SimError::InvalidParameter { name, value } => {
                write!(f, "invalid value {value} for parameter `{name}`")
            }
            SimError::NonFinite { field } => write!(f, "field `{field}` contains non-finite values"),
        }
    }
}

impl Error for SimError {}
