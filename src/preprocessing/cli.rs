use std::{error::Error, fs::File, io::BufReader, path::PathBuf};

use clap::Parser;
use tracing::info;

use crate::{
    preprocessing::{
        ImageStreamSettings, InterfaceMode, SimulationInput, WindowSettings,
        preprocessor::mask_from_image, serial_mask::SerialMask,
    },
    sim::{poisson::PRESSURE_ITERATIONS, smoke::SmokeParams, tracer::Tracer},
};

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(help = "Optional PNG image whose dark pixels start out as obstacles.")]
    pub mask_path: Option<PathBuf>,

    #[arg(long, help = "An input file with pre-loaded parameters.")]
    pub input_json: Option<PathBuf>,

    #[arg(long, help = "Optional path to save the resolved input file to.")]
    pub input_json_savepath: Option<PathBuf>,

    #[arg(
        long,
        help = "The mode to run the simulation in: `window` or `frames`",
        default_value = "window"
    )]
    pub mode: String,

    #[arg(
        long,
        help = "Directory that headless frames are written to.",
        default_value = "smoke-frames"
    )]
    pub frames_dir: PathBuf,

    #[arg(long, help = "Number of frames to run headless.", default_value = "600")]
    pub frame_count: usize,

    #[arg(long, help = "Save every n-th headless frame.", default_value = "1")]
    pub save_every: usize,

    #[arg(short = 'n', long, help = "Grid edge length in cells.", default_value = "128")]
    pub grid_size: usize,

    #[arg(long, help = "Display pixels per cell.", default_value = "5")]
    pub scale: usize,

    #[arg(long, help = "Timestep per frame.", default_value = "0.1")]
    pub dt: f32,

    #[arg(long, help = "Velocity diffusion coefficient.", default_value = "0.001")]
    pub viscosity: f32,

    #[arg(long, help = "Horizontal inflow speed.", default_value = "2.0")]
    pub inflow_speed: f32,

    #[arg(long, help = "First inflow column.", default_value = "1")]
    pub inflow_start: usize,

    #[arg(long, help = "One past the last inflow column.", default_value = "4")]
    pub inflow_end: usize,

    #[arg(long, help = "Jacobi sweeps per pressure projection.", default_value_t = PRESSURE_ITERATIONS)]
    pub pressure_iterations: usize,

    #[arg(long, help = "Tracer starting row (defaults to the middle row).")]
    pub tracer_row: Option<f32>,

    #[arg(long, help = "Tracer starting column.", default_value = "5.0")]
    pub tracer_col: f32,

    #[arg(long, help = "Speed added by right-dragging in the window.", default_value = "4.0")]
    pub impulse_speed: f32,

    #[arg(long, help = "Target frames per second in the window.", default_value = "60")]
    pub fps: usize,

    #[arg(short, long, help = "Log per-frame diagnostics.")]
    pub verbose: bool,
}

impl CliArgs {
    pub fn crate_input(&self) -> Result<SimulationInput, Box<dyn Error + Send + Sync>> {
        // if the input file is supplied, just use that
        if let Some(input_filepath) = &self.input_json {
            if !input_filepath.is_file() {
                return Err(format!("Input file {:?} is not a readable file.", input_filepath).into());
            }

            info!("Using input file {}", input_filepath.display());

            let reader = BufReader::new(File::open(input_filepath)?);
            let mut loaded_input: SimulationInput = serde_json::from_reader(reader)
                .map_err(|err| format!("Failed to deserialize input file: {err}"))?;

            if loaded_input.mask.is_none() {
                if let Some(mask_path) = &self.mask_path {
                    let mask = mask_from_image(mask_path, loaded_input.grid_size)?;
                    loaded_input.mask = Some(SerialMask::from_mask(&mask));
                }
            }

            return Ok(loaded_input);
        }

        // otherwise, build the input from the other arguments
        let mode = match self.mode.as_str() {
            "window" => InterfaceMode::Window(WindowSettings {
                fps: self.fps,
                impulse_speed: self.impulse_speed,
            }),
            "frames" => InterfaceMode::ImageStream(ImageStreamSettings {
                frames_dir: self.frames_dir.clone(),
                frame_count: self.frame_count,
                save_every: self.save_every,
                edits: Vec::new(),
            }),
            _ => {
                return Err(format!(
                    "'{}' is not a valid interface mode. Use --help for info.",
                    self.mode
                )
                .into());
            }
        };

        let mask = match &self.mask_path {
            Some(mask_path) => Some(SerialMask::from_mask(&mask_from_image(
                mask_path,
                self.grid_size,
            )?)),
            None => None,
        };

        let n = self.grid_size;

        Ok(SimulationInput {
            mode,
            mask,
            grid_size: n,
            scale: self.scale,
            solver: SmokeParams {
                dt: self.dt,
                viscosity: self.viscosity,
                inflow_speed: self.inflow_speed,
                inflow_columns: (self.inflow_start, self.inflow_end),
                pressure_iterations: self.pressure_iterations,
            },
            tracer_start: Tracer::new(self.tracer_row.unwrap_or(n as f32 / 2.), self.tracer_col),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_input_defaults() {
        let args = CliArgs::parse_from(["navier-smoke"]);
        let input = args.crate_input().unwrap();

        let expected = SimulationInput::with_grid_size(
            128,
            InterfaceMode::Window(WindowSettings {
                fps: 60,
                impulse_speed: 4.,
            }),
        );

        assert_eq!(input, expected);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_frames_mode() {
        let args = CliArgs::parse_from([
            "navier-smoke",
            "--mode",
            "frames",
            "-n",
            "40",
            "--frame-count",
            "12",
            "--tracer-row",
            "7.5",
        ]);
        let input = args.crate_input().unwrap();

        assert_eq!(input.grid_size, 40);
        assert_eq!(input.tracer_start, Tracer::new(7.5, 5.));
        assert!(matches!(
            input.mode,
            InterfaceMode::ImageStream(ImageStreamSettings { frame_count: 12, .. })
        ));
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let args = CliArgs::parse_from(["navier-smoke", "--mode", "video"]);
        assert!(args.crate_input().is_err());
    }
}
