// Numeric approximations shared by the solver operators

use na::DMatrix;

use crate::{ScalarField, VectorField};

/// Compute the finite-difference gradient of a scalar field **in the x axis**.
/// Uses a central finite difference for interior nodes and a first-order
/// forward/backward (depends on side) finite difference for edge nodes.
///
/// Parameters:
/// - `field` - A reference to the scalar field to take the gradient of
/// - `dx` - The size of the elements in the x-axis
///
/// Returns:
/// - A `ScalarField` with the finite difference of each element
pub fn gradient_x(field: &ScalarField, dx: f32) -> ScalarField {
    let (rows, cols) = field.shape();

    let mut df_dx: DMatrix<f32> = DMatrix::zeros(rows, cols);

    // set interior nodes
    for r in 0..rows {
        for c in 1..(cols - 1) {
            df_dx[(r, c)] = (field[(r, c + 1)] - field[(r, c - 1)]) / (2.0 * dx);
        }
    }

    // set edge nodes
    for r in 0..rows {
        df_dx[(r, 0)] = (field[(r, 1)] - field[(r, 0)]) / dx;
        df_dx[(r, cols - 1)] = (field[(r, cols - 1)] - field[(r, cols - 2)]) / dx;
    }

    df_dx
}

/// Compute the finite-difference gradient of a scalar field **in the y axis**.
/// Uses a central finite difference for interior nodes and a first-order
/// forward/backward (depends on side) finite difference for edge nodes.
///
/// Parameters:
/// - `field` - A reference to the scalar field to take the gradient of
/// - `dy` - The size of the elements in the y-axis
///
/// Returns:
/// - A `ScalarField` with the finite difference of each element
pub fn gradient_y(field: &ScalarField, dy: f32) -> ScalarField {
    let (rows, cols) = field.shape();

    let mut df_dy: DMatrix<f32> = DMatrix::zeros(rows, cols);

    // set interior nodes
    for r in 1..(rows - 1) {
        for c in 0..cols {
            df_dy[(r, c)] = (field[(r + 1, c)] - field[(r - 1, c)]) / (2.0 * dy);
        }
    }

    // set edge nodes
    for c in 0..cols {
        df_dy[(0, c)] = (field[(1, c)] - field[(0, c)]) / dy;
        df_dy[(rows - 1, c)] = (field[(rows - 1, c)] - field[(rows - 2, c)]) / dy;
    }

    df_dy
}

/// Compute the divergence of some vector field F=<u,v>. That is, ∇⋅F
///
/// Mathematically, this is du/dx + dv/dy
///
/// Parameters:
/// - `field` - The `VectorField` to take the divergence of
/// - `dy` - The y-axis step size
/// - `dx` - The x-axis step size
///
/// Returns:
///     A `ScalarField` of the divergence.
pub fn divergence(field: &VectorField, dy: f32, dx: f32) -> ScalarField {
    let du_dx: DMatrix<f32> = gradient_x(&field[0], dx);
    let dv_dy: DMatrix<f32> = gradient_y(&field[1], dy);

    du_dx + dv_dy
}

/// Map a (possibly out-of-range) index onto an axis of length `len` by
/// mirroring about the half-sample edges: `.. b a | a b c d | d c ..`
pub fn reflect_index(k: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let k = k.rem_euclid(period);

    if k >= len as isize {
        (period - 1 - k) as usize
    } else {
        k as usize
    }
}

/// Bilinearly sample `field` at the fractional position `(y, x)`, resolving
/// out-of-range neighbours with [`reflect_index`].
pub fn sample_bilinear(field: &ScalarField, y: f32, x: f32) -> f32 {
    let (rows, cols) = field.shape();

    let (y0, x0) = (y.floor(), x.floor());
    let (ty, tx) = (y - y0, x - x0);
    let (y0, x0) = (y0 as isize, x0 as isize);

    let r0 = reflect_index(y0, rows);
    let r1 = reflect_index(y0 + 1, rows);
    let c0 = reflect_index(x0, cols);
    let c1 = reflect_index(x0 + 1, cols);

    (1. - ty) * ((1. - tx) * field[(r0, c0)] + tx * field[(r0, c1)])
        + ty * ((1. - tx) * field[(r1, c0)] + tx * field[(r1, c1)])
}

/// Whether every element of the field is finite
pub fn all_finite(field: &ScalarField) -> bool {
    field.iter().all(|f| f.is_finite())
}

/// Largest velocity magnitude in the field
pub fn max_speed(field: &VectorField) -> f32 {
    field[0]
        .iter()
        .zip(field[1].iter())
        .fold(0.0f32, |m, (u, v)| m.max((u * u + v * v).sqrt()))
}
