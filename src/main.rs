use std::{error::Error, fs::File, io::BufWriter, process::exit};

use anyhow::{Context, anyhow};
use clap::Parser;
use navier_smoke::{preprocessing::cli::CliArgs, sim::task};
use tracing::{Level, error, info};

fn main() {
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    if let Err(err) = run(&args) {
        error!("{err:#}");
        exit(1);
    }
}

/// Adopt a front-end error, keeping its source chain
fn report(err: Box<dyn Error + Send + Sync>) -> anyhow::Error {
    anyhow!(err)
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let simulation_input = args
        .crate_input()
        .map_err(report)
        .context("Unable to build the simulation input")?;

    simulation_input
        .validate()
        .map_err(report)
        .context("Invalid simulation input")?;

    if let Some(savepath) = &args.input_json_savepath {
        let writer = BufWriter::new(
            File::create(savepath)
                .with_context(|| format!("Unable to create {}", savepath.display()))?,
        );
        serde_json::to_writer_pretty(writer, &simulation_input)?;
        info!("Saved input file to {}", savepath.display());
    }

    simulation_input.log();

    let output = task::run(&simulation_input)
        .map_err(report)
        .context("Simulation stopped")?;

    info!(
        "Finished {} frames ({:.2} time units simulated)",
        output.frames, output.elapsed_time
    );

    Ok(())
}
