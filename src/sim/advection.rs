// Semi-lagrangian advection

use na::DMatrix;

use crate::{ObstacleMask, ScalarField, sim::numeric};

/// Transport `field` along the velocity `(u, v)` for one timestep by tracing
/// every cell backwards and resampling the field at the source position.
///
/// The traced position is clamped into the grid on each axis before it is
/// bilinearly sampled (out-of-range neighbours reflect back into the grid),
/// so the scheme is stable for any `dt`. Obstacle cells come out as zero.
///
/// Parameters
/// - `field` - The quantity to transport
/// - `u` - Horizontal velocity (cells per unit time, along columns)
/// - `v` - Vertical velocity (cells per unit time, along rows)
/// - `obstacles` - Cells that never hold any quantity
/// - `dt` - The timestep
///
/// Returns
/// - The transported field
pub fn advect(
    field: &ScalarField,
    u: &ScalarField,
    v: &ScalarField,
    obstacles: &ObstacleMask,
    dt: f32,
) -> ScalarField {
    let (rows, cols) = field.shape();
    let (max_y, max_x) = ((rows - 1) as f32, (cols - 1) as f32);

    DMatrix::from_fn(rows, cols, |i, j| {
        if obstacles[(i, j)] {
            return 0.;
        }

        let y_back = (i as f32 - dt * v[(i, j)]).clamp(0., max_y);
        let x_back = (j as f32 - dt * u[(i, j)]).clamp(0., max_x);

        numeric::sample_bilinear(field, y_back, x_back)
    })
}

#[cfg(test)]
mod tests {
    use na::dmatrix;

    use super::*;

    fn no_obstacles(rows: usize, cols: usize) -> ObstacleMask {
        DMatrix::from_element(rows, cols, false)
    }

    #[test]
    fn test_zero_velocity_is_identity() {
        let field: DMatrix<f32> = dmatrix![
            0.1, 0.5, 0.2, 0.9, 0.3;
            0.4, 0.8, 0.6, 0.0, 0.7;
            1.0, 0.3, 0.5, 0.2, 0.6;
            0.2, 0.9, 0.1, 0.4, 0.8;
        ];
        let zeros = DMatrix::zeros(4, 5);

        let advected = advect(&field, &zeros, &zeros, &no_obstacles(4, 5), 0.25);

        assert_eq!(advected, field);
    }

    #[test]
    fn test_uniform_flow_shifts_field() {
        // a ramp along the columns moving right by half a cell
        let field = DMatrix::from_fn(3, 6, |_, j| j as f32);
        let u = DMatrix::from_element(3, 6, 1.0);
        let v = DMatrix::zeros(3, 6);

        let advected = advect(&field, &u, &v, &no_obstacles(3, 6), 0.5);

        // column 0 traces to -0.5 which clamps onto the edge
        assert_eq!(advected[(1, 0)], 0.);
        for j in 1..6 {
            assert!((advected[(1, j)] - (j as f32 - 0.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_trace_past_far_edge_is_defined() {
        let field = DMatrix::from_fn(4, 4, |i, j| (i * 4 + j) as f32);
        let u = DMatrix::from_element(4, 4, -100.0);
        let v = DMatrix::from_element(4, 4, -100.0);

        let advected = advect(&field, &u, &v, &no_obstacles(4, 4), 1.0);

        // every trace clamps onto the bottom-right corner
        assert!(advected.iter().all(|x| *x == 15.));
    }

    #[test]
    fn test_obstacle_cells_are_zeroed() {
        let field = DMatrix::from_element(5, 5, 0.75);
        let zeros = DMatrix::zeros(5, 5);
        let mut obstacles = no_obstacles(5, 5);
        obstacles[(2, 2)] = true;
        obstacles[(0, 4)] = true;

        let advected = advect(&field, &zeros, &zeros, &obstacles, 0.1);

        assert_eq!(advected[(2, 2)], 0.);
        assert_eq!(advected[(0, 4)], 0.);
        assert_eq!(advected[(2, 3)], 0.75);
    }
}
