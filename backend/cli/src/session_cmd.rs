//! `medlens session`: inspect or discard the persisted wizard progress.

use anyhow::Result;
use clap::Subcommand;

use crate::context::AppContext;
use crate::terminal_output::{note_info, note_success, render_fields};

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Show the unfinished scan, if any
    Show,
    /// Discard the unfinished scan (the API key is kept)
    Reset,
}

pub async fn run(ctx: &AppContext, cmd: SessionCommands) -> Result<()> {
    match cmd {
        SessionCommands::Show => match ctx.sessions.load_session().await? {
            Some(session) => {
                let total = ctx.config.steps().len();
                let rows = [
                    ("Session", session.session_id.to_string()),
                    ("Confirmed", format!("{} of {total} photos", session.confirmed_images.len())),
                    ("Updated", session.updated_at.to_rfc3339()),
                ];
                print!("{}", render_fields(&rows, 80));
            }
            None => note_info("No unfinished scan"),
        },
        SessionCommands::Reset => {
            ctx.sessions.clear_session().await?;
            note_success("Unfinished scan discarded");
        }
    }
    Ok(())
}
