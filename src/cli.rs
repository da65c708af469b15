use clap::{Parser, Subcommand};
use mac_dispatch::dispatch::ModelKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "macd", version, about = "Abatement cost curves and dispatch welfare models")]
pub struct Cli {
    /// Configuration file (defaults, then this file, then MACD__ variables)
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Marginal abatement cost model
    Mac {
        #[command(subcommand)]
        command: MacCommands,
    },
    /// Solve one of the dispatch models
    Dispatch {
        /// Formulation to solve (i, ii or iii)
        #[arg(long)]
        model: Option<ModelKind>,
        /// Scenario file (.toml or .json); the built-in sample is used otherwise
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Seed for the ModelI sample scenario
        #[arg(long)]
        seed: Option<u64>,
        /// Print one line per hour instead of the full JSON solution
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum MacCommands {
    /// Cost, emission, welfare and MAC curves over an energy grid
    Report {
        /// Number of grid points
        #[arg(long)]
        points: Option<usize>,
        /// Directory to write one CSV file per curve
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Unregulated and socially optimal outcome
    Optimum,
    /// Technology-disaggregated MAC curve and optimal emission price
    Tech {
        /// Emission prices to trace the curve at (comma separated)
        #[arg(long, value_delimiter = ',')]
        prices: Vec<f64>,
    },
}
