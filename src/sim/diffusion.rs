// Viscous diffusion approximated by a gaussian blur

use na::DMatrix;

use crate::{ScalarField, sim::numeric::reflect_index};

/// Kernel half-width in standard deviations
const TRUNCATE: f32 = 4.0;

/// Below this the blur is treated as the identity
const MIN_SIGMA: f32 = 1e-15;

/// Build a normalized 1D gaussian kernel of radius `floor(TRUNCATE * sigma + 0.5)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let denom = 2. * sigma * sigma;

    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) / denom).exp())
        .collect();

    let total: f32 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= total);

    weights
}

/// Convolve along one axis (0 = rows, 1 = columns) with reflected edges
fn convolve_axis(field: &ScalarField, kernel: &[f32], axis: usize) -> ScalarField {
    let (rows, cols) = field.shape();
    let radius = (kernel.len() / 2) as isize;

    DMatrix::from_fn(rows, cols, |i, j| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let offset = k as isize - radius;
                let sample = if axis == 0 {
                    field[(reflect_index(i as isize + offset, rows), j)]
                } else {
                    field[(i, reflect_index(j as isize + offset, cols))]
                };
                w * sample
            })
            .sum()
    })
}

/// Spread `field` as if by diffusion with coefficient `amount` over one
/// timestep. Instead of an implicit solve this applies a separable gaussian
/// blur with standard deviation `sqrt(amount / dt)`.
///
/// Parameters
/// - `field` - The field to diffuse
/// - `amount` - The diffusion coefficient (viscosity for velocity)
/// - `dt` - The timestep
///
/// Returns
/// - The blurred field
pub fn diffuse(field: &ScalarField, amount: f32, dt: f32) -> ScalarField {
    let sigma = (amount / dt).sqrt();

    if sigma <= MIN_SIGMA {
        return field.clone_owned();
    }

    let kernel = gaussian_kernel(sigma);
    let blurred_rows = convolve_axis(field, &kernel, 0);
    convolve_axis(&blurred_rows, &kernel, 1)
}

#[cfg(test)]
mod tests {
    use na::dmatrix;

    use super::*;

    #[test]
    fn test_zero_amount_is_identity() {
        let field: DMatrix<f32> = dmatrix![
            0.3, 0.0, 1.0;
            0.7, 0.2, 0.5;
            0.9, 0.4, 0.1;
        ];

        assert_eq!(diffuse(&field, 0., 0.1), field);
    }

    #[test]
    fn test_kernel_is_normalized() {
        for sigma in [0.1, 0.8, 2.5] {
            let kernel = gaussian_kernel(sigma);
            let total: f32 = kernel.iter().sum();

            assert!((total - 1.).abs() < 1e-5);
            assert_eq!(kernel.len() % 2, 1);
            assert_eq!(kernel[0], kernel[kernel.len() - 1]);
        }

        // radius = floor(4 * 0.8 + 0.5) = 3
        assert_eq!(gaussian_kernel(0.8).len(), 7);
    }

    #[test]
    fn test_spike_spreads_and_conserves_mass() {
        let mut field = DMatrix::zeros(15, 15);
        field[(7, 7)] = 1.0;

        let diffused = diffuse(&field, 0.1, 0.1);

        let total: f32 = diffused.iter().sum();
        assert!((total - 1.).abs() < 1e-4);
        assert!(diffused[(7, 7)] < 1.);
        assert!(diffused[(7, 8)] > 0.);
        assert!(diffused[(7, 7)] > diffused[(7, 8)]);
        assert!((diffused[(6, 7)] - diffused[(8, 7)]).abs() < 1e-6);
    }

    #[test]
    fn test_constant_field_survives_edges() {
        let field = DMatrix::from_element(6, 9, 0.4);

        let diffused = diffuse(&field, 2., 0.1);

        assert!(diffused.iter().all(|x| (x - 0.4).abs() < 1e-5));
    }
}
