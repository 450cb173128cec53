// Handles PNG obstacle input

use image::{GenericImageView, ImageReader, Pixel};
use na::DMatrix;
use std::{error::Error, path::Path};

use crate::{ObstacleMask, sim::error::SimError};

const THRESHOLD_LUMA: u8 = 127;

/// Load an obstacle mask from a PNG image: dark pixels are obstacles.
///
/// Parameters
/// - `image` - The path to the image to process
/// - `grid_size` - The edge length the image must have, in pixels
///
/// Returns
/// - The obstacle mask, one cell per pixel, as a Result
pub fn mask_from_image(
    image: &Path,
    grid_size: usize,
) -> Result<ObstacleMask, Box<dyn Error + Send + Sync>> {
    let image = ImageReader::open(image)?.decode()?;

    let (nrows, ncols) = (image.height() as usize, image.width() as usize);
    if (nrows, ncols) != (grid_size, grid_size) {
        return Err(SimError::ShapeMismatch {
            what: "obstacle image",
            expected: (grid_size, grid_size),
            actual: (nrows, ncols),
        }
        .into());
    }

    let mut mask: ObstacleMask = DMatrix::from_element(nrows, ncols, false);

    image.pixels().for_each(|(x, y, color)| {
        mask[(y as usize, x as usize)] = color.to_luma().0[0] < THRESHOLD_LUMA
    });

    Ok(mask)
}
