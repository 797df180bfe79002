//! A terminal front end for `streamchat`.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use streamchat::core::transcript::{MessageId, Role, TranscriptEvent};
use streamchat::core::{ModelId, SessionSnapshot};
use streamchat::{AppConfig, Session, SessionBuilder};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum SessionEvent {
    Idle,
    Reply(MessageId, String),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session = SessionBuilder::from_config(config)
        .on_idle({
            let event_tx = event_tx.clone();
            move || {
                event_tx.send(SessionEvent::Idle).ok();
            }
        })
        .on_transcript_change({
            let event_tx = event_tx.clone();
            move |event, transcript| {
                let (TranscriptEvent::Appended(id)
                | TranscriptEvent::Updated(id)) = event
                else {
                    return;
                };
                let Some(message) = transcript.get(*id) else {
                    return;
                };
                if message.role() == Role::Assistant {
                    event_tx
                        .send(SessionEvent::Reply(
                            *id,
                            message.content().to_owned(),
                        ))
                        .ok();
                }
            }
        })
        .build();

    if let Err(err) = session.health_check().await {
        println!(
            "{}⚠️  Backend health check failed: {err}",
            BAR_CHAR.bright_yellow()
        );
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();

        if line == "/clear" {
            if session.clear_chat().is_err() {
                break;
            }
            println!("{}Chat cleared.", BAR_CHAR.bright_black());
            continue;
        }
        if let Some(arg) = line.strip_prefix("/model") {
            if !handle_model_command(&session, arg.trim()).await {
                break;
            }
            continue;
        }

        if session.send_message(line).is_err() {
            break;
        }
        let Ok(snapshot) = session.snapshot().await else {
            break;
        };
        if !snapshot.is_sending() {
            // Rejected before anything was sent.
            print_status(&snapshot);
            continue;
        }

        let mut progress_bar = None;
        let mut reply: Option<(MessageId, usize)> = None;

        loop {
            // Spin until the first fragment arrives.
            if reply.is_none() {
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep => {
                    continue;
                }
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }

            match event {
                SessionEvent::Reply(id, content) => {
                    let printed = match reply {
                        Some((reply_id, printed)) if reply_id == id => printed,
                        _ => {
                            print!("{}🤖 ", BAR_CHAR.bright_cyan());
                            0
                        }
                    };
                    // The content only grows, so the printed prefix is
                    // always on a character boundary.
                    let delta = content.get(printed..).unwrap_or_default();
                    print!("{}", delta.bright_white());
                    std::io::stdout().flush().ok();
                    reply = Some((id, content.len()));
                }
                SessionEvent::Idle => {
                    if reply.is_some() {
                        println!();
                    }
                    break;
                }
            }
        }

        let Ok(snapshot) = session.snapshot().await else {
            break;
        };
        print_status(&snapshot);
    }
}

/// Handles `/model [id]`, returns `false` if the session has stopped.
async fn handle_model_command(session: &Session, arg: &str) -> bool {
    if arg.is_empty() {
        let Ok(snapshot) = session.snapshot().await else {
            return false;
        };
        for model in ModelId::ALL {
            let marker = if model == snapshot.form.model { "*" } else { " " };
            println!(
                "{marker} {:<14} {} ({})",
                model.as_str().bright_white(),
                model.display_name(),
                model.description().bright_black()
            );
        }
        return true;
    }

    match arg.parse::<ModelId>() {
        Ok(model) => {
            if session.set_model(model).is_err() {
                return false;
            }
            println!(
                "{}Switched to {}.",
                BAR_CHAR.bright_black(),
                model.display_name()
            );
        }
        Err(err) => {
            println!("{}{err}", BAR_CHAR.bright_red());
        }
    }
    true
}

fn print_status(snapshot: &SessionSnapshot) {
    if let Some(err) = &snapshot.last_error {
        println!("{}❌ {}", BAR_CHAR.bright_red(), err.red());
    } else if let Some(notice) = &snapshot.last_notice {
        println!("{}{}", BAR_CHAR.bright_green(), notice.bright_black());
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
