//! CLI argument definitions for Shibutz

use clap::{Args, Parser, Subcommand, ValueEnum};
use logger::Level;
use shibutz::core::progress::ProgressLevel;
use std::path::PathBuf;

/// CLI log level argument.
///
/// Doubles as the progress-callback cadence (see the progress contract)
/// and maps onto a runtime logger level.
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevelArg {
    /// Start and end only.
    Minimal,
    /// Each 10% milestone.
    Normal,
    /// Every accepted iteration.
    Detailed,
    /// Every proposal.
    Debug,
}

impl From<LogLevelArg> for ProgressLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Minimal => Self::Minimal,
            LogLevelArg::Normal => Self::Normal,
            LogLevelArg::Detailed => Self::Detailed,
            LogLevelArg::Debug => Self::Debug,
        }
    }
}

impl From<LogLevelArg> for Level {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Minimal => Self::Warn,
            LogLevelArg::Normal | LogLevelArg::Detailed => Self::Info,
            LogLevelArg::Debug => Self::Debug,
        }
    }
}

impl std::fmt::Display for LogLevelArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_str = match self {
            Self::Minimal => "minimal",
            Self::Normal => "normal",
            Self::Detailed => "detailed",
            Self::Debug => "debug",
        };
        write!(f, "{as_str}")
    }
}

/// Flags shared by the roster-consuming commands.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonFlags {
    /// Base directory for the run's output artifacts
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Normalize invalid cells to safe defaults instead of failing
    #[arg(long)]
    pub skip_validation: bool,

    /// Override the hard minimum-friends threshold
    #[arg(long, value_name = "N")]
    pub min_friends: Option<usize>,

    /// Override the per-algorithm iteration cap
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Override the early-stop threshold (consecutive non-improving iterations)
    #[arg(long, value_name = "N")]
    pub early_stop: Option<usize>,

    /// Override the number of classes to create
    #[arg(long, value_name = "N")]
    pub target_classes: Option<usize>,

    /// Seed for all random decisions (reproducible runs)
    #[arg(long, value_name = "N", default_value_t = 42)]
    pub random_seed: u64,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Display the active configuration as TOML.
    Show,
    /// Set one configuration value by dotted key.
    Set {
        /// Configuration key (e.g. `weights.layers.student`)
        #[arg(value_name = "KEY")]
        key: String,
        /// Value to set
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Reset the stored configuration to the built-in defaults.
    Reset,
    /// Show where the configuration lives and whether it is valid.
    Status,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score an assigned roster and print the layer decomposition.
    Score {
        /// Path to the roster table
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        #[command(flatten)]
        common: CommonFlags,
    },
    /// Optimize a roster's assignment with one or more algorithms.
    Optimize {
        /// Path to the roster table
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        #[command(flatten)]
        common: CommonFlags,

        /// Algorithm for the single strategy
        #[arg(long, value_name = "NAME", default_value = "local_search")]
        algorithm: String,

        /// Algorithms for multi-run strategies
        #[arg(long, value_name = "NAMES", num_args = 1.., value_delimiter = ',')]
        algorithms: Vec<String>,

        /// How to compose the algorithms
        #[arg(long, value_name = "STRATEGY", default_value = "single")]
        strategy: String,

        /// Initialization strategy for unassigned rosters
        #[arg(long, value_name = "NAME", default_value = "constraint_aware")]
        init_strategy: String,

        /// Total wall-clock budget in seconds
        #[arg(long, value_name = "SECONDS")]
        time_budget: Option<u64>,
    },
    /// Establish a random-swap baseline distribution for a roster.
    Baseline {
        /// Path to the roster table
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        #[command(flatten)]
        common: CommonFlags,

        /// Number of baseline runs
        #[arg(long, value_name = "N", default_value_t = 10)]
        num_runs: usize,

        /// Initialization strategy for unassigned rosters
        #[arg(long, value_name = "NAME", default_value = "constraint_aware")]
        init_strategy: String,
    },
    /// Produce an initial assignment for an unassigned roster.
    #[command(name = "generate-assignment")]
    GenerateAssignment {
        /// Path to the roster table
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        #[command(flatten)]
        common: CommonFlags,

        /// Initialization strategy
        #[arg(long, value_name = "NAME", default_value = "constraint_aware")]
        init_strategy: String,
    },
    /// Validate a roster table and report constraint violations.
    Validate {
        /// Path to the roster table
        #[arg(value_name = "FILE")]
        input_file: PathBuf,

        /// Normalize invalid cells to safe defaults instead of failing
        #[arg(long)]
        skip_validation: bool,

        /// Override the hard minimum-friends threshold
        #[arg(long, value_name = "N")]
        min_friends: Option<usize>,
    },
    /// Manage configuration.
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
    /// Interactive menu over the same operations.
    Interactive,
}

#[derive(Parser, Debug)]
#[command(
    name = "shibutz",
    about = "Shibutz: balanced class-assignment scoring and optimization",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Progress/logging level (minimal|normal|detailed|debug)
    #[arg(long, value_enum, default_value = "normal")]
    pub log_level: LogLevelArg,

    /// Load configuration from an explicit file instead of the user config
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write runtime logs to a file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}
