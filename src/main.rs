use clap::Parser;
use color_eyre::Result;
use log::info;

use chamber_sweep::measurement::{ManifestMeasurement, MeasurementOptions};
use chamber_sweep::plan::{angle_rng, points_per_frequency};
use chamber_sweep::sweep::SweepOrchestrator;
use chamber_sweep::transport::{LogTransport, SerialTransport, Transport};
use chamber_sweep::{load_run_inputs, SweepParams};

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let params = SweepParams::parse();
    params.pretty_print();

    let (config, catalog) = load_run_inputs(&params)?;
    config.log_summary();
    if let Some(points) = points_per_frequency(&config) {
        info!(
            "{} point(s) per frequency, {} in total",
            points,
            points * config.ku_frequencies_hz.len()
        );
    }

    let transport: Box<dyn Transport> = if params.dry_run {
        Box::new(LogTransport::default())
    } else {
        Box::new(SerialTransport::new(config.link.clone()))
    };
    let mut orchestrator = SweepOrchestrator::new(
        &config,
        &catalog,
        transport,
        ManifestMeasurement,
        angle_rng(params.seed),
    )
    .with_power_cycle(!params.skip_power_cycle)
    .with_measurement_options(MeasurementOptions {
        s_parameters: params.s_parameters,
    });

    let summary = orchestrator.run()?;
    println!(
        "{} point(s) measured, {} command timeout(s), {} failed measurement(s)",
        summary.points, summary.command_timeouts, summary.measurement_failures
    );
    Ok(())
}
