//! Config command handler

use crate::args::ConfigSubcommand;
use shibutz::core::config::Config;
use shibutz::core::error::CoreError;
use std::path::Path;

/// Handle the config subcommand; `show` when none is given.
///
/// # Errors
/// Propagates configuration parse, validation and I/O errors.
pub fn run(
    subcommand: Option<ConfigSubcommand>,
    config_path: Option<&Path>,
) -> Result<(), CoreError> {
    match subcommand.unwrap_or(ConfigSubcommand::Show) {
        ConfigSubcommand::Show => {
            let config = super::load_config(config_path)?;
            let rendered = toml::to_string_pretty(&config).expect("config serializes");
            println!("{rendered}");
        }
        ConfigSubcommand::Set { key, value } => {
            let mut config = super::load_config(config_path)?;
            config.set(&key, &value)?;
            let path = match config_path {
                Some(path) => {
                    config.save_to(path)?;
                    path.to_path_buf()
                }
                None => config.save()?,
            };
            println!("✓ {key} = {value} written to {}", path.display());
        }
        ConfigSubcommand::Reset => {
            let config = Config::default();
            let path = match config_path {
                Some(path) => {
                    config.save_to(path)?;
                    path.to_path_buf()
                }
                None => config.save()?,
            };
            println!("✓ Configuration reset to defaults at {}", path.display());
        }
        ConfigSubcommand::Status => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration file: {}", path.display());
            if !path.exists() {
                println!("Status: not present (defaults in effect)");
                return Ok(());
            }
            match Config::load_from(&path) {
                Ok(_) => println!("Status: present and valid"),
                Err(err) => println!("Status: INVALID ({err})"),
            }
        }
    }
    Ok(())
}
