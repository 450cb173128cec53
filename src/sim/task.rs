// Frame loops that wire the collaborators to the solver

use std::error::Error;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::{
    observers::{
        EditSource, FrameSink, ScriptedEdits, Split, imgstream::ImageStream, window::SmokeWindow,
    },
    preprocessing::{ImageStreamSettings, InterfaceMode, SimulationInput, WindowSettings},
    sim::smoke::Smoke,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutput {
    pub frames: usize,     // completed steps
    pub elapsed_time: f32, // simulated time
}

/// Run steps until the front-end asks to stop or `limit` frames have
/// completed. Each step consumes the pending edits and is presented before
/// the next one starts.
pub fn drive<F>(
    sim: &mut Smoke,
    front: &mut F,
    limit: Option<usize>,
    mut on_frame: impl FnMut(&Smoke),
) -> Result<SimulationOutput, Box<dyn Error + Send + Sync>>
where
    F: EditSource + FrameSink,
{
    let mut frames = 0;

    while limit.is_none_or(|l| frames < l) && !front.wants_exit() {
        let edits = front.poll_edits();

        sim.step(&edits).inspect_err(|err| {
            error!(
                "Simulation faulted at frame {}: {}",
                sim.iteration() + 1,
                err
            )
        })?;

        front.present(&sim.frame())?;
        on_frame(sim);
        frames += 1;
    }

    Ok(SimulationOutput {
        frames,
        elapsed_time: sim.time(),
    })
}

/// The solver task to run in Window mode
pub fn window_task(
    settings: &WindowSettings,
    mut sim: Smoke,
) -> Result<SimulationOutput, Box<dyn Error + Send + Sync>> {
    let (rows, cols) = sim.grid().shape();
    let mut window = SmokeWindow::open(
        rows,
        cols,
        sim.frame().scale,
        settings.fps,
        settings.impulse_speed,
    )?;

    let output = drive(&mut sim, &mut window, None, |_| {})?;
    info!(
        "Window closed after {} frames ({:.2} time units)",
        output.frames, output.elapsed_time
    );

    Ok(output)
}

/// The solver task to run in ImageStream mode
pub fn imgstream_task(
    settings: &ImageStreamSettings,
    mut sim: Smoke,
) -> Result<SimulationOutput, Box<dyn Error + Send + Sync>> {
    let bar = ProgressBar::new(settings.frame_count as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames (Remaining: {eta_precise})",
        )?
        .progress_chars("##-"),
    );

    let mut front = Split {
        input: ScriptedEdits::new(&settings.edits),
        sink: ImageStream::start(&settings.frames_dir, settings.save_every)?,
    };

    let output = drive(&mut sim, &mut front, Some(settings.frame_count), |_| {
        bar.inc(1)
    });
    bar.finish();

    // drain the IO thread even if the run faulted
    let saved = front.sink.finish()?;
    info!(
        "Saved {} frames to {}",
        saved,
        settings.frames_dir.display()
    );

    output
}

/// Build the simulation and run it in the configured front-end
pub fn run(
    simulation_input: &SimulationInput,
) -> Result<SimulationOutput, Box<dyn Error + Send + Sync>> {
    let sim = simulation_input.build_sim()?;

    match &simulation_input.mode {
        InterfaceMode::Window(settings) => window_task(settings, sim),
        InterfaceMode::ImageStream(settings) => imgstream_task(settings, sim),
    }
}
