// Passive tracer particle carried by the flow

use serde::{Deserialize, Serialize};

use crate::{ScalarField, VectorField};

/// A massless point in continuous grid coordinates (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tracer {
    pub y: f32,
    pub x: f32,
}

/// Linear interpolation of `samples(k)` at fractional index `t`
fn lerp_at(t: f32, samples: impl Fn(usize) -> f32) -> f32 {
    let k = t.floor();
    let frac = t - k;
    let k = k as usize;

    (1. - frac) * samples(k) + frac * samples(k + 1)
}

impl Tracer {
    pub fn new(y: f32, x: f32) -> Self {
        Tracer { y, x }
    }

    /// Whether the tracer sits in the interior region `[1, rows-2) x [1, cols-2)`
    /// where its neighbourhood can be sampled.
    pub fn in_safe_interior(&self, rows: usize, cols: usize) -> bool {
        (1.0..(rows as f32 - 2.0)).contains(&self.y)
            && (1.0..(cols as f32 - 2.0)).contains(&self.x)
    }

    /// Local `(vertical, horizontal)` speed. `v` is interpolated down the
    /// tracer's column, `u` along its row.
    fn local_velocity(&self, u: &ScalarField, v: &ScalarField) -> (f32, f32) {
        let (row, col) = (self.y.floor() as usize, self.x.floor() as usize);

        let vy = lerp_at(self.y, |r| v[(r, col)]);
        let vx = lerp_at(self.x, |c| u[(row, c)]);

        (vy, vx)
    }

    /// Move the tracer along the velocity field for one timestep. Outside the
    /// safe interior the tracer is left where it is; it is neither clamped
    /// nor reset.
    ///
    /// Returns whether the tracer moved.
    pub fn advance(&mut self, velocity: &VectorField, dt: f32) -> bool {
        let (rows, cols) = velocity[0].shape();

        if !self.in_safe_interior(rows, cols) {
            return false;
        }

        let (vy, vx) = self.local_velocity(&velocity[0], &velocity[1]);
        self.y += vy * dt;
        self.x += vx * dt;

        true
    }
}
