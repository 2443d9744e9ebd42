//! Command-line interface entry point for Shibutz

mod args;
mod commands;

use args::{Cli, Command};
use clap::Parser;
use logger::{error, init_file_logging, set_level};
use shibutz::core::error::CoreError;

fn main() {
    let cli = Cli::parse();
    set_level(cli.log_level.into());

    if let Some(log_path) = &cli.log_file {
        if !init_file_logging(log_path) {
            eprintln!("✗ Failed to initialize file logging at: {}", log_path.display());
        }
    }

    let outcome = dispatch(cli);
    if let Err(err) = outcome {
        error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<(), CoreError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Score { input_file, common } => {
            commands::score::run(&input_file, &common, config_path)
        }
        Command::Optimize {
            input_file,
            common,
            algorithm,
            algorithms,
            strategy,
            init_strategy,
            time_budget,
        } => commands::optimize::run(
            &commands::optimize::OptimizeArgs {
                input_file: &input_file,
                common: &common,
                algorithm: &algorithm,
                algorithms: &algorithms,
                strategy: &strategy,
                init_strategy: &init_strategy,
                time_budget,
                log_level: cli.log_level,
            },
            config_path,
        ),
        Command::Baseline {
            input_file,
            common,
            num_runs,
            init_strategy,
        } => commands::baseline::run(&input_file, &common, num_runs, &init_strategy, config_path),
        Command::GenerateAssignment {
            input_file,
            common,
            init_strategy,
        } => commands::generate::run(&input_file, &common, &init_strategy, config_path),
        Command::Validate {
            input_file,
            skip_validation,
            min_friends,
        } => commands::validate::run(&input_file, skip_validation, min_friends, config_path),
        Command::Config { subcommand } => commands::config::run(subcommand, config_path),
        Command::Interactive => commands::interactive::run(config_path, cli.log_level),
    }
}
