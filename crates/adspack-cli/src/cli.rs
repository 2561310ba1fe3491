use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "adspack CLI - Generate active sites on catalytic surfaces and sample collision-free adsorbate packings.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used by parallel sampling sessions.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack adsorbates onto a surface and write the sampled conformations as multi-frame XYZ.
    Sample(SampleArgs),
    /// Generate the active sites of a surface and write them as a CSV table.
    Sites(SitesArgs),
}

/// Arguments for the `sample` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SampleArgs {
    /// Path to the job file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path for the output multi-frame XYZ file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Override the number of conformations to sample.
    #[arg(short = 'n', long, value_name = "INT")]
    pub conformations: Option<usize>,

    /// Override the number of independent packing sessions.
    #[arg(long, value_name = "INT")]
    pub sessions: Option<usize>,

    /// Override the random seed. Session k uses seed + k.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Skip the distortion pass after each packing.
    #[arg(long)]
    pub no_randomize: bool,

    /// Set a specific configuration value, overriding the job file.
    /// Can be used multiple times. Example: -S packing.collision-threshold=0.8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `sites` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SitesArgs {
    /// Path to the job file in TOML format. Only the substrate and sites sections are used.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path for the output CSV file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Set a specific configuration value, overriding the job file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
