use na::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{ObstacleMask, sim::error::SimError};

/// An obstacle mask in a JSON-friendly layout (column-major bytes)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SerialMask {
    data: Vec<u8>,
    nrows: usize,
    ncols: usize,
}

impl SerialMask {
    pub fn from_mask(mask: &ObstacleMask) -> Self {
        let (nrows, ncols) = mask.shape();

        Self {
            data: mask.iter().map(|b| *b as u8).collect(),
            nrows,
            ncols,
        }
    }

    pub fn to_mask(&self) -> Result<ObstacleMask, SimError> {
        if self.data.len() != self.nrows * self.ncols {
            return Err(SimError::ShapeMismatch {
                what: "serialized mask",
                expected: (self.nrows, self.ncols),
                actual: (self.data.len(), 1),
            });
        }

        Ok(DMatrix::from_iterator(
            self.nrows,
            self.ncols,
            self.data.iter().map(|b| *b != 0),
        ))
    }
}
