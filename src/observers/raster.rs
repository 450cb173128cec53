// Converts a frame into an RGB pixel buffer

use crate::observers::Frame;

pub const OBSTACLE_COLOR: (u8, u8, u8) = (255, 0, 0);
pub const TRACER_COLOR: (u8, u8, u8) = (0, 255, 0);

/// Half-width of the square marker drawn for the tracer
const TRACER_RADIUS: isize = 2;

/// A `0RGB` pixel buffer, row-major
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

pub fn pack_rgb((r, g, b): (u8, u8, u8)) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

pub fn unpack_rgb(px: u32) -> (u8, u8, u8) {
    ((px >> 16) as u8, (px >> 8) as u8, px as u8)
}

impl Raster {
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }
}

/// Render density as grey levels, obstacles in red and the tracer as a
/// small green square, each cell blown up to `scale x scale` pixels.
pub fn rasterize(frame: &Frame<'_>) -> Raster {
    let (rows, cols) = frame.density.shape();
    let scale = frame.scale.max(1);
    let (width, height) = (cols * scale, rows * scale);

    let mut pixels = vec![0u32; width * height];

    for py in 0..height {
        for px in 0..width {
            let cell = (py / scale, px / scale);

            let color = if frame.obstacles[cell] {
                OBSTACLE_COLOR
            } else {
                let grey = (frame.density[cell] * 255.).clamp(0., 255.) as u8;
                (grey, grey, grey)
            };

            pixels[py * width + px] = pack_rgb(color);
        }
    }

    // tracer marker, centred on the tracer's pixel and clipped at the border
    let ty = (frame.tracer.y * scale as f32).floor() as isize;
    let tx = (frame.tracer.x * scale as f32).floor() as isize;

    if (0..height as isize).contains(&ty) && (0..width as isize).contains(&tx) {
        for y in (ty - TRACER_RADIUS).max(0)..(ty + TRACER_RADIUS + 1).min(height as isize) {
            for x in (tx - TRACER_RADIUS).max(0)..(tx + TRACER_RADIUS + 1).min(width as isize) {
                pixels[y as usize * width + x as usize] = pack_rgb(TRACER_COLOR);
            }
        }
    }

    Raster {
        width,
        height,
        pixels,
    }
}
