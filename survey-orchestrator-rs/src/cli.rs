// survey-orchestrator-rs/src/cli.rs
// Command line surface of the survey binary

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "survey-orchestrator",
    version,
    about = "Street imagery survey: capture, classify and export a grid of points"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Increase logging verbosity (-v, -vv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full survey and write the dataset.
    Run(RunArgs),
    /// Print the grid coordinates without contacting any service.
    Grid(GridArgs),
}

#[derive(Debug, Clone, Args)]
pub struct GridArgs {
    /// Latitude of the grid center, in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    /// Longitude of the grid center, in decimal degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
    /// Side length of the square grid, in meters.
    #[arg(long, short = 'd')]
    pub distance: f64,
    /// Spacing between neighbouring points, in meters.
    #[arg(long, short = 's')]
    pub step: f64,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Worker pool size (overrides SURVEY_WORKERS).
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,
    /// Directory the run results are created in (overrides SURVEY_OUTPUT_ROOT).
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,
    /// Language of the assessment justification (overrides SURVEY_RESPONSE_LANGUAGE).
    #[arg(long)]
    pub language: Option<String>,
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
