//! `medlens key`: manage the provider credential in the local store.

use anyhow::{bail, Result};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::{AppContext, API_KEY_ENV};
use crate::terminal_output::{note_info, note_success, note_warn};

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Save the API key (read from stdin when omitted)
    Set { key: Option<String> },
    /// Remove the saved API key
    Clear,
    /// Show where the API key comes from
    Status,
}

/// First and last few characters only.
pub fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}

pub async fn run(ctx: &AppContext, cmd: KeyCommands) -> Result<()> {
    match cmd {
        KeyCommands::Set { key } => {
            let key = match key {
                Some(k) => k,
                None => {
                    note_info("Paste the API key and press Enter:");
                    BufReader::new(tokio::io::stdin()).lines().next_line().await?.unwrap_or_default()
                }
            };
            if key.trim().is_empty() {
                bail!("empty API key");
            }
            ctx.sessions.set_credential(&key).await?;
            note_success(&format!("API key saved ({})", mask(key.trim())));
        }
        KeyCommands::Clear => {
            ctx.sessions.clear_credential().await?;
            note_success("API key removed");
        }
        KeyCommands::Status => match ctx.sessions.credential().await? {
            Some(key) => note_success(&format!("Saved API key: {}", mask(&key))),
            None => match ctx.credential_fallback() {
                Some(key) => note_info(&format!("Using API key from config or {API_KEY_ENV}: {}", mask(&key))),
                None => note_warn("No API key configured. Run `medlens key set`."),
            },
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_keys() {
        assert_eq!(mask("sk-abcdefghijkl"), "sk-a***kl");
        assert_eq!(mask("short"), "***");
    }
}
