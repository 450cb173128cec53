// Interactive minifb front-end: paints obstacles from the mouse and shows frames

use std::error::Error;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use screen_size::get_primary_screen_size as get_screen_size;
use tracing::{info, warn};

use crate::{
    observers::{EditSource, Frame, FrameSink, raster},
    sim::grid::{CellRegion, Edit},
};

/// Edge of the square brush, in cells
const BRUSH_SIZE: usize = 5;

/// Shrink `scale` so a `rows x cols` grid fits on the primary screen
pub fn fit_scale(rows: usize, cols: usize, scale: usize) -> usize {
    let Ok((screen_w, screen_h)) = get_screen_size() else {
        warn!("Unable to query the screen size; keeping display scale {scale}");
        return scale;
    };

    let max_scale = ((screen_w as usize) / cols).min((screen_h as usize) / rows).max(1);
    if scale > max_scale {
        warn!(
            "A {rows}x{cols} grid at scale {scale} does not fit a {screen_w}x{screen_h} screen; using scale {max_scale}"
        );
        return max_scale;
    }

    scale
}

/// Translate a cursor position in window pixels into the centre cell of a
/// brush stroke, kept far enough from the edges that the whole brush fits.
pub fn brush_cell(mouse: (f32, f32), scale: usize, rows: usize, cols: usize) -> (isize, isize) {
    let half = (BRUSH_SIZE / 2) as isize;
    let (mx, my) = (mouse.0.max(0.) as usize, mouse.1.max(0.) as usize);

    // the upper bound wins on grids narrower than the brush
    let keep_inside =
        |cell: usize, len: usize| (cell as isize).max(half).min(len as isize - 1 - half);

    (keep_inside(my / scale, rows), keep_inside(mx / scale, cols))
}

/// The interactive window. Left mouse paints obstacles, right mouse pushes
/// the flow along `+u`, `C` clears obstacles and `Escape` quits.
pub struct SmokeWindow {
    window: Window,
    rows: usize,
    cols: usize,
    scale: usize,
    impulse_speed: f32,
}

impl SmokeWindow {
    pub fn open(
        rows: usize,
        cols: usize,
        scale: usize,
        fps: usize,
        impulse_speed: f32,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let scale = fit_scale(rows, cols, scale);

        let mut window = Window::new(
            "Navier Smoke",
            cols * scale,
            rows * scale,
            WindowOptions::default(),
        )?;
        window.set_target_fps(fps);

        info!(
            "Opened {}x{} window ({} px per cell, {} fps)",
            cols * scale,
            rows * scale,
            scale,
            fps
        );

        Ok(SmokeWindow {
            window,
            rows,
            cols,
            scale,
            impulse_speed,
        })
    }

    /// The display scale actually in use
    pub fn scale(&self) -> usize {
        self.scale
    }
}

impl EditSource for SmokeWindow {
    fn poll_edits(&mut self) -> Vec<Edit> {
        let mut edits = Vec::new();

        if self.window.is_key_pressed(Key::C, KeyRepeat::No) {
            edits.push(Edit::ClearObstacles);
        }

        if let Some(mouse) = self.window.get_mouse_pos(MouseMode::Discard) {
            let (row, col) = brush_cell(mouse, self.scale, self.rows, self.cols);
            let region = CellRegion::square(row, col, BRUSH_SIZE);

            if self.window.get_mouse_down(MouseButton::Left) {
                edits.push(Edit::Obstacle(region));
            }
            if self.window.get_mouse_down(MouseButton::Right) {
                edits.push(Edit::Impulse {
                    region,
                    u: self.impulse_speed,
                    v: 0.,
                });
            }
        }

        edits
    }

    fn wants_exit(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}

impl FrameSink for SmokeWindow {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let frame = Frame {
            scale: self.scale,
            ..*frame
        };
        let raster = raster::rasterize(&frame);

        self.window
            .update_with_buffer(&raster.pixels, raster.width, raster.height)?;

        Ok(())
    }
}
