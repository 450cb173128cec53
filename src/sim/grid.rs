// Grid state: the fields owned by the simulation and the edits applied to them

use std::ops::Range;

use na::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    ObstacleMask, ScalarField, VectorField,
    sim::{error::SimError, numeric},
};

/// Smallest grid edge the operators support
pub const MIN_GRID_SIZE: usize = 4;

/// A rectangular block of cells, in grid coordinates. May extend past the
/// grid; it is clipped when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRegion {
    pub row: isize,
    pub col: isize,
    pub height: usize,
    pub width: usize,
}

impl CellRegion {
    /// A `size x size` block centred on `(row, col)`
    pub fn square(row: isize, col: isize, size: usize) -> Self {
        let half = (size / 2) as isize;
        CellRegion {
            row: row.saturating_sub(half),
            col: col.saturating_sub(half),
            height: size,
            width: size,
        }
    }

    /// The row and column ranges of this region that lie inside a
    /// `rows x cols` grid, or `None` if the region misses the grid entirely.
    pub fn clip(&self, rows: usize, cols: usize) -> Option<(Range<usize>, Range<usize>)> {
        let clip_axis = |start: isize, len: usize, bound: usize| {
            let lo = start.max(0) as usize;
            let hi = start.saturating_add_unsigned(len).clamp(0, bound as isize) as usize;
            (lo < hi).then_some(lo..hi)
        };

        Some((
            clip_axis(self.row, self.height, rows)?,
            clip_axis(self.col, self.width, cols)?,
        ))
    }
}

/// A user edit delivered by the input collaborator before a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Edit {
    /// Mark every cell of the region as an obstacle
    Obstacle(CellRegion),

    /// Add a signed velocity to every free cell of the region
    Impulse { region: CellRegion, u: f32, v: f32 },

    /// Remove every obstacle
    ClearObstacles,
}

/// The fixed-size field data of the simulation.
#[derive(Debug, Clone)]
pub struct FluidGrid {
    rows: usize,
    cols: usize,

    /// Scalar quantity carried by the flow, kept within [0, 1]
    pub density: ScalarField,

    /// Velocity field; index 0 is `u` (along columns), 1 is `v` (along rows)
    pub velocity: VectorField,

    /// Cells blocked by user-placed obstacles
    pub obstacles: ObstacleMask,
}

impl FluidGrid {
    /// Allocate a zeroed `rows x cols` grid with no obstacles
    pub fn new(rows: usize, cols: usize) -> Result<Self, SimError> {
        if rows < MIN_GRID_SIZE || cols < MIN_GRID_SIZE {
            return Err(SimError::GridTooSmall { rows, cols });
        }

        Ok(FluidGrid {
            rows,
            cols,
            density: DMatrix::zeros(rows, cols),
            velocity: [DMatrix::zeros(rows, cols), DMatrix::zeros(rows, cols)],
            obstacles: DMatrix::from_element(rows, cols, false),
        })
    }

    /// Allocate a zeroed grid shaped after `mask`, starting with those obstacles
    pub fn with_obstacles(mask: &ObstacleMask) -> Result<Self, SimError> {
        let (rows, cols) = mask.shape();
        let mut grid = FluidGrid::new(rows, cols)?;
        grid.obstacles.copy_from(mask);
        Ok(grid)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Check that every field still has the grid's shape and holds only
    /// finite values.
    pub fn validate(&self) -> Result<(), SimError> {
        let expected = self.shape();

        let scalars: [(&'static str, &ScalarField); 3] = [
            ("density", &self.density),
            ("u", &self.velocity[0]),
            ("v", &self.velocity[1]),
        ];

        for (name, field) in scalars {
            if field.shape() != expected {
                return Err(SimError::ShapeMismatch {
                    what: name,
                    expected,
                    actual: field.shape(),
                });
            }
            if !numeric::all_finite(field) {
                return Err(SimError::NonFinite { field: name });
            }
        }

        if self.obstacles.shape() != expected {
            return Err(SimError::ShapeMismatch {
                what: "obstacles",
                expected,
                actual: self.obstacles.shape(),
            });
        }

        Ok(())
    }

    /// Apply a single user edit. Regions are clipped to the grid.
    pub fn apply_edit(&mut self, edit: &Edit) {
        match edit {
            Edit::Obstacle(region) => {
                if let Some((rows, cols)) = region.clip(self.rows, self.cols) {
                    self.obstacles
                        .view_mut((rows.start, cols.start), (rows.len(), cols.len()))
                        .fill(true);
                }
            }
            Edit::Impulse { region, u, v } => {
                if let Some((rows, cols)) = region.clip(self.rows, self.cols) {
                    for r in rows {
                        for c in cols.clone() {
                            if !self.obstacles[(r, c)] {
                                self.velocity[0][(r, c)] += u;
                                self.velocity[1][(r, c)] += v;
                            }
                        }
                    }
                }
            }
            Edit::ClearObstacles => self.obstacles.fill(false),
        }
    }

    /// Number of obstacle cells
    pub fn obstacle_count(&self) -> usize {
        self.obstacles.iter().filter(|o| **o).count()
    }
}
