//! `medlens config`: show, validate or initialize the config file.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use medlens_config::{apply_all_defaults, redact, validate, write_config, MedLensConfig};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective config with secrets masked
    Show,
    /// Print the config file path
    Path,
    /// Check the config file for errors
    Validate,
    /// Write a config file with every default filled in
    Init {
        /// Overwrite an existing file (a backup is kept)
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(config: &MedLensConfig, path: &Path, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let value = redact(&serde_json::to_value(config)?);
            print!("{}", serde_yaml::to_string(&value)?);
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Validate => {
            let report = validate(config);
            for warning in &report.warnings {
                note_warn(&format!("{}: {}", warning.path, warning.message));
            }
            for error in &report.errors {
                note_error(&format!("{}: {}", error.path, error.message));
            }
            if !report.is_valid() {
                bail!("{} config error(s)", report.errors.len());
            }
            note_success("Config is valid");
        }
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                note_info(&format!("{} already exists (use --force to overwrite)", path.display()));
                return Ok(());
            }
            write_config(&apply_all_defaults(MedLensConfig::default()), path).await?;
            note_success(&format!("Wrote {}", path.display()));
        }
    }
    Ok(())
}
