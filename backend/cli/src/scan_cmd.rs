//! `medlens scan`: drive the capture wizard from the terminal.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use medlens_core::{CaptureSource, MedLensError};
use medlens_store::SessionStore;
use medlens_wizard::{ScanWizard, WizardPhase, WizardView};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::context::AppContext;
use crate::key_cmd::mask;
use crate::present;
use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Photos to use for the capture steps, in step order
    #[arg(long, num_args = 1..)]
    pub images: Vec<PathBuf>,
    /// Confirm every capture without asking
    #[arg(short, long)]
    pub yes: bool,
    /// Ignore any unfinished scan and start over
    #[arg(long)]
    pub fresh: bool,
    /// "label" (database lookup) or "guidance" (ask the model directly)
    #[arg(long)]
    pub variant: Option<String>,
}

struct Prompter<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl Prompter {
    fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompter<R> {
    fn from_reader(reader: R) -> Self {
        Self { lines: reader.lines() }
    }

    /// Ask a question; `None` on end of input.
    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{question} ").as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}

enum Review {
    Confirm,
    Retake,
    Quit,
}

fn parse_review(answer: &str) -> Option<Review> {
    match answer.to_ascii_lowercase().as_str() {
        "" | "c" | "confirm" | "y" | "yes" => Some(Review::Confirm),
        "r" | "retake" => Some(Review::Retake),
        "q" | "quit" => Some(Review::Quit),
        _ => None,
    }
}

fn describe_step(view: &WizardView, step: usize) -> String {
    let label = view.step_label.as_deref().unwrap_or("photo");
    format!("Step {}/{} ({label})", step + 1, view.total_steps)
}

pub async fn run(ctx: &AppContext, args: ScanArgs) -> Result<()> {
    let wizard = ctx.open_wizard(args.variant.as_deref()).await?;
    let mut queued: VecDeque<PathBuf> = args.images.into();
    let scripted = !queued.is_empty();
    let mut prompter = Prompter::stdin();
    let interactive = !(scripted || args.yes);

    let mut view = if args.fresh { wizard.start_scan().await? } else { wizard.view().await };
    match view.phase {
        WizardPhase::Finalizing => note_info("Resuming unfinished scan: every photo is confirmed"),
        _ if view.step_index > 0 => {
            note_info(&format!("Resuming unfinished scan at step {} of {}", view.step_index + 1, view.total_steps))
        }
        _ => {}
    }

    loop {
        view = match view.phase.clone() {
            WizardPhase::Idle { step } => {
                let path = match queued.pop_front() {
                    Some(path) => path,
                    None if scripted => bail!("{} needs a photo but --images ran out", describe_step(&view, step)),
                    None => {
                        let question = format!("{}: path to photo (q to quit):", describe_step(&view, step));
                        match prompter.ask(&question).await? {
                            None => return Ok(()),
                            Some(a) if a.eq_ignore_ascii_case("q") => return Ok(()),
                            Some(a) if a.is_empty() => continue,
                            Some(a) => PathBuf::from(a),
                        }
                    }
                };
                match wizard.capture(&CaptureSource::File(path)).await {
                    Ok(next) => next,
                    Err(e) if e.is_recoverable() && !scripted => {
                        note_error(&e.to_string());
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            WizardPhase::Reviewing { step } => {
                let size = view.draft.as_ref().map(|d| d.len()).unwrap_or(0);
                note_success(&format!("{} captured ({} KB)", describe_step(&view, step), size.div_ceil(1024)));
                let decision = if args.yes || scripted {
                    Review::Confirm
                } else {
                    match prompter.ask("[c]onfirm, [r]etake or [q]uit?").await? {
                        None => Review::Quit,
                        Some(answer) => match parse_review(&answer) {
                            Some(d) => d,
                            None => continue,
                        },
                    }
                };
                match decision {
                    Review::Confirm => wizard.confirm_current().await?,
                    Review::Retake => wizard.retake_current().await?,
                    Review::Quit => {
                        note_info("Scan paused. Confirmed photos are kept for next time.");
                        return Ok(());
                    }
                }
            }
            WizardPhase::Finalizing => {
                note_info(&format!("Identifying the medicine ({} photos)...", view.step_index));
                match finalize_scan(&wizard, &ctx.sessions, &mut prompter, interactive).await? {
                    Some(next) => next,
                    None => return Ok(()),
                }
            }
            WizardPhase::Done { outcome } => {
                print!("{}", present::render_outcome(&outcome));
                if !restart(&wizard, &mut prompter, !interactive).await? {
                    return Ok(());
                }
                wizard.view().await
            }
            WizardPhase::Error { message } => {
                print!("{}", present::render_failure(&message));
                if !restart(&wizard, &mut prompter, !interactive).await? {
                    return Ok(());
                }
                wizard.view().await
            }
        };
    }
}

/// Run finalization. A missing key is asked for inline and the attempt
/// repeated; `None` means the scan stops with the wizard still finalizing.
async fn finalize_scan<R: AsyncBufRead + Unpin>(
    wizard: &ScanWizard,
    sessions: &SessionStore,
    prompter: &mut Prompter<R>,
    interactive: bool,
) -> Result<Option<WizardView>> {
    loop {
        let Err(e) = wizard.finalize().await else {
            return Ok(Some(wizard.view().await));
        };
        let next = wizard.view().await;
        if next.phase != WizardPhase::Finalizing {
            return Ok(Some(next));
        }
        if interactive && matches!(e, MedLensError::Configuration(_)) {
            note_warn(&e.to_string());
            if prompt_credential(prompter, sessions).await? {
                continue;
            }
        }
        print!("{}", present::render_error(&e));
        return Ok(None);
    }
}

/// Ask for the provider key and save it. `false` if none was given.
async fn prompt_credential<R: AsyncBufRead + Unpin>(
    prompter: &mut Prompter<R>,
    sessions: &SessionStore,
) -> Result<bool> {
    let Some(key) = prompter.ask("API key (empty to stop):").await?.filter(|k| !k.is_empty()) else {
        return Ok(false);
    };
    sessions.set_credential(&key).await?;
    note_success(&format!("API key saved ({})", mask(&key)));
    Ok(true)
}

/// Offer another scan. Resets the wizard when accepted.
async fn restart<R: AsyncBufRead + Unpin>(
    wizard: &ScanWizard,
    prompter: &mut Prompter<R>,
    non_interactive: bool,
) -> Result<bool> {
    if non_interactive {
        return Ok(false);
    }
    let again = matches!(
        prompter.ask("Scan another package? [y/N]").await?.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y") | Some("yes")
    );
    if again {
        wizard.reset_session().await?;
    }
    Ok(again)
}
