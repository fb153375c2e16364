// survey-orchestrator-rs/src/main.rs
// Main Entry Point for the survey binary

mod cli;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use survey_orchestrator::{
    preflight, preview_grid, CancelHandle, CollectionOrchestrator, GridSpec, RunEvent, SampleCoordinate,
    SurveyConfig, SurveyOutcome,
};
use tokio::sync::mpsc;

use crate::cli::{Cli, Command, GridArgs, RunArgs};

fn grid_spec(args: &GridArgs) -> GridSpec {
    GridSpec::new(SampleCoordinate::new(args.lat, args.lon), args.distance, args.step)
}

fn print_grid(args: &GridArgs) -> anyhow::Result<()> {
    let coordinates = preview_grid(&grid_spec(args))?;
    for coordinate in &coordinates {
        println!("{},{}", coordinate.latitude, coordinate.longitude);
    }
    info!("{} points", coordinates.len());
    Ok(())
}

fn print_summary(outcome: &SurveyOutcome) {
    let summary = &outcome.summary;
    println!("Results directory: {}", outcome.context.results_dir().display());
    println!("Dataset: {}", outcome.dataset_path.display());
    println!(
        "Points: {} total, {} captured, {} failed",
        summary.total, summary.captured, summary.fetch_failures
    );
    if let Some(percent) = summary.valid_image_percent() {
        println!("Valid images: {:.1}% of {} assessed", percent, summary.assessed);
    }
    match (summary.mean_priority_index, summary.priority_level()) {
        (Some(index), Some(level)) => println!("Mean priority index: {:.2} ({})", index, level),
        _ => println!("Mean priority index: n/a"),
    }
}

async fn log_progress(mut events: mpsc::UnboundedReceiver<RunEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            RunEvent::Started { total } => info!("Dispatching {} points", total),
            RunEvent::PointFinished { completed, total, failed } => {
                info!("Progress: {}/{} points ({} failed)", completed, total, failed)
            }
            RunEvent::Persisted { path } => info!("Dataset persisted: {}", path.display()),
            RunEvent::State(_) => {}
        }
    }
}

async fn run_survey(args: RunArgs) -> anyhow::Result<()> {
    let mut config = SurveyConfig::from_env();
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(root) = args.output_root {
        config.output_root = root;
    }
    if let Some(language) = args.language {
        config.response_language = language;
    }

    let spec = grid_spec(&args.grid);
    let points = preflight(&spec, &config)?;
    info!("Grid accepted: {} points", points.len());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let orchestrator = CollectionOrchestrator::from_env(config)
        .context("failed to build service clients")?
        .with_events(events_tx);
    let progress = tokio::spawn(log_progress(events_rx));

    let (handle, signal) = CancelHandle::pair();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl+C received, cancelling survey");
                handle.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let result = orchestrator.run(spec, signal).await;
    drop(orchestrator);
    let _ = progress.await;

    print_summary(&result?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_file = config_rs::load_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter())).init();
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    info!(
        "Starting {} v{}",
        config_rs::get_formatted_service_name("ORCHESTRATOR"),
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Command::Grid(args) => print_grid(&args),
        Command::Run(args) => run_survey(args).await,
    }
}
