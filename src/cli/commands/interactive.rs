//! Interactive menu
//!
//! A small line-oriented loop over the same operations the subcommands
//! expose, for administrators who prefer prompts over flags.

use crate::args::{CommonFlags, LogLevelArg};
use shibutz::core::error::CoreError;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

fn prompt(question: &str) -> io::Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_path(question: &str) -> io::Result<Option<PathBuf>> {
    let answer = prompt(question)?;
    if answer.is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(answer)))
}

/// Run the interactive menu until the user quits.
///
/// # Errors
/// Propagates I/O errors from the terminal; operation errors are printed
/// and the menu continues.
pub fn run(config_path: Option<&Path>, log_level: LogLevelArg) -> Result<(), CoreError> {
    println!("Shibutz interactive mode: q quits");
    loop {
        println!();
        println!("  1) score a roster");
        println!("  2) optimize a roster");
        println!("  3) baseline a roster");
        println!("  4) validate a roster");
        println!("  5) show configuration");
        println!("  q) quit");
        let choice = prompt("> ")?;

        let outcome: Result<(), CoreError> = match choice.as_str() {
            "1" | "2" | "3" | "4" => {
                let Some(input) = prompt_path("roster file: ")? else {
                    println!("no file given");
                    continue;
                };
                let common = CommonFlags::default();
                match choice.as_str() {
                    "1" => super::score::run(&input, &common, config_path),
                    "2" => {
                        let algorithm = {
                            let answer =
                                prompt("algorithm [local_search]: ")?;
                            if answer.is_empty() {
                                "local_search".to_string()
                            } else {
                                answer
                            }
                        };
                        super::optimize::run(
                            &super::optimize::OptimizeArgs {
                                input_file: &input,
                                common: &common,
                                algorithm: &algorithm,
                                algorithms: &[],
                                strategy: "single",
                                init_strategy: "constraint_aware",
                                time_budget: None,
                                log_level,
                            },
                            config_path,
                        )
                    }
                    "3" => super::baseline::run(&input, &common, 10, "constraint_aware", config_path),
                    _ => super::validate::run(&input, false, None, config_path),
                }
            }
            "5" => super::config::run(Some(crate::args::ConfigSubcommand::Show), config_path),
            "q" | "quit" | "exit" => break,
            "" => continue,
            other => {
                println!("unknown choice: {other}");
                continue;
            }
        };

        if let Err(err) = outcome {
            println!("✗ {err}");
        }
    }
    Ok(())
}
