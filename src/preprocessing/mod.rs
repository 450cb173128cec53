use std::{error::Error, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ObstacleMask,
    observers::ScheduledEdit,
    preprocessing::serial_mask::SerialMask,
    sim::{
        error::SimError,
        grid::FluidGrid,
        smoke::{Smoke, SmokeParams},
        tracer::Tracer,
    },
};

pub mod cli;
pub mod preprocessor;
pub mod serial_mask;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WindowSettings {
    pub fps: usize,
    pub impulse_speed: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageStreamSettings {
    pub frames_dir: PathBuf,
    pub frame_count: usize,
    pub save_every: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<ScheduledEdit>, // replayed in place of mouse input
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum InterfaceMode {
    Window(WindowSettings),
    ImageStream(ImageStreamSettings),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulationInput {
    pub mode: InterfaceMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<SerialMask>, // starting obstacles; none means an empty grid
    pub grid_size: usize,
    pub scale: usize,

    #[serde(flatten)]
    pub solver: SmokeParams,
    pub tracer_start: Tracer,
}

impl SimulationInput {
    /// Default run over an `n x n` grid
    pub fn with_grid_size(n: usize, mode: InterfaceMode) -> Self {
        SimulationInput {
            mode,
            mask: None,
            grid_size: n,
            scale: 5,
            solver: SmokeParams::default(),
            tracer_start: Tracer::new(n as f32 / 2., 5.),
        }
    }

    pub fn get_mask(&self) -> Result<Option<ObstacleMask>, SimError> {
        self.mask.as_ref().map(SerialMask::to_mask).transpose()
    }

    /// Check everything the solver and front-ends will assume
    pub fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let n = self.grid_size;

        if self.scale == 0 {
            return Err("display scale must be at least 1".into());
        }

        match &self.mode {
            InterfaceMode::Window(settings) => {
                if settings.fps == 0 {
                    return Err("fps must be at least 1".into());
                }
                if !settings.impulse_speed.is_finite() {
                    return Err("impulse speed must be finite".into());
                }
            }
            InterfaceMode::ImageStream(settings) => {
                if settings.save_every == 0 {
                    return Err("save-every must be at least 1".into());
                }
            }
        }

        if let Some(mask) = self.get_mask()? {
            if mask.shape() != (n, n) {
                return Err(SimError::ShapeMismatch {
                    what: "obstacle mask",
                    expected: (n, n),
                    actual: mask.shape(),
                }
                .into());
            }
        }

        // grid size and solver parameters
        let grid = FluidGrid::new(n, n)?;
        self.solver.validate(grid.cols())?;

        Ok(())
    }

    /// Allocate the simulation described by this input
    pub fn build_sim(&self) -> Result<Smoke, SimError> {
        let grid = match self.get_mask()? {
            Some(mask) => FluidGrid::with_obstacles(&mask)?,
            None => FluidGrid::new(self.grid_size, self.grid_size)?,
        };

        Smoke::new(grid, self.solver, self.tracer_start, self.scale)
    }

    pub fn log(&self) {
        info!(
            "Simulation is shown below:\n\n\
        \t grid:        {n} x {n} cells\n\
        \t scale:       {} px per cell\n\
        \t dt:          {}\n\
        \t viscosity:   {}\n\
        \t inflow:      {} cells/unit over columns [{}, {})\n\
        \t pressure:    {} jacobi sweeps\n\
        \t tracer:      ({}, {})\n\
        \t obstacles:   {}\n\n\
        ",
            self.scale,
            self.solver.dt,
            self.solver.viscosity,
            self.solver.inflow_speed,
            self.solver.inflow_columns.0,
            self.solver.inflow_columns.1,
            self.solver.pressure_iterations,
            self.tracer_start.y,
            self.tracer_start.x,
            if self.mask.is_some() { "preloaded" } else { "none" },
            n = self.grid_size,
        );

        if let Ok(mode_str) = serde_json::to_string_pretty(&self.mode) {
            info!("Mode parameters are:\n\n{}", mode_str);
        }
    }
}
