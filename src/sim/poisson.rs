// Pressure projection with a fixed-sweep Jacobi solve

use na::DMatrix;

use crate::{ScalarField, VectorField, sim::numeric};

/// Default number of Jacobi sweeps per projection
pub const PRESSURE_ITERATIONS: usize = 10;

/// Approximately solve the poisson equation ∇²p = g by Jacobi relaxation,
/// starting from p = 0. Neighbour lookups wrap around the grid edges
/// (periodic boundary), unlike the reflected edges of advection and
/// diffusion.
///
/// Parameters
/// - `rhs` - The field (g); i.e. the RHS of the poisson equation
/// - `iterations` - The exact number of sweeps to run
///
/// Returns
/// - The relaxed pressure field
pub fn jacobi_solve(rhs: &ScalarField, iterations: usize) -> ScalarField {
    let (rows, cols) = rhs.shape();

    let mut p: ScalarField = DMatrix::zeros(rows, cols);

    for _ in 0..iterations {
        let prev = p.clone();

        for i in 0..rows {
            let (up, down) = ((i + rows - 1) % rows, (i + 1) % rows);

            for j in 0..cols {
                let (left, right) = ((j + cols - 1) % cols, (j + 1) % cols);

                p[(i, j)] = (prev[(up, j)] + prev[(down, j)] + prev[(i, left)] + prev[(i, right)]
                    - rhs[(i, j)])
                    / 4.;
            }
        }
    }

    p
}

/// Remove (most of) the divergence from the velocity field in place by
/// subtracting the gradient of the relaxed pressure.
///
/// Parameters
/// - `velocity` - The `(u, v)` field to project
/// - `iterations` - Number of Jacobi sweeps for the pressure solve
pub fn project(velocity: &mut VectorField, iterations: usize) {
    let div: ScalarField = numeric::divergence(velocity, 1., 1.);

    let p: ScalarField = jacobi_solve(&div, iterations);

    velocity[0] -= numeric::gradient_x(&p, 1.);
    velocity[1] -= numeric::gradient_y(&p, 1.);
}
