//! Interactive chat session (`cardwise chat`).
//!
//! Reads one query per line from stdin and answers it with the full
//! conversation as context. Lines starting with `/` are meta-commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/history` | Print the conversation so far |
//! | `/quit`, `/exit` | End the session |
//!
//! Ctrl-C while a query is running cancels that query and leaves the
//! conversation untouched; the session continues. Ctrl-C at the prompt ends
//! the session.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::ask::{print_output, run_options};
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::progress::ProgressMode;
use crate::session::{Session, TurnOutcome};

pub async fn run_chat(
    config: &Config,
    top_k: Option<usize>,
    no_refine: bool,
    show_results: bool,
    progress: ProgressMode,
) -> Result<()> {
    let options = run_options(config, top_k, no_refine)?;
    let mut session = Session::new(Pipeline::from_config(config)?, options)
        .with_timeout(Duration::from_secs(config.retrieval.query_timeout_secs));
    let reporter = progress.reporter();
    let mut interrupts = Interrupts::listen()?;

    println!("CardWise: ask about Hong Kong credit card terms. /history, /quit");

    let mut lines = stdin_lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = interrupts.recv() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        let query = line.trim();

        match query {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                print_history(&session);
                continue;
            }
            other if other.starts_with('/') => {
                println!("Unknown command: {}", other);
                continue;
            }
            _ => {}
        }

        let started = Instant::now();
        tokio::select! {
            outcome = session.ask(query, None, reporter.as_ref()) => match outcome {
                TurnOutcome::Answered(output) => {
                    eprintln!("Processed in {:.2} seconds.", started.elapsed().as_secs_f64());
                    print_output(&output, show_results);
                }
                TurnOutcome::Failed(err) => {
                    println!("An error occurred: {}", err);
                }
            },
            _ = interrupts.recv() => {
                println!("Cancelled.");
            }
        }
        println!();
    }

    Ok(())
}

/// Read stdin lines on a plain thread.
///
/// A blocking read cannot be cancelled, so it must not run on the runtime's
/// blocking pool or leaving the loop would wait for the next line. The
/// channel closes on EOF.
fn stdin_lines() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Ctrl-C listener that lives for the whole session.
///
/// Installing it replaces the default terminate-on-SIGINT behavior, so every
/// place the loop waits must also wait on it. Signals that arrive while
/// nothing is polling are kept until the next `recv`.
struct Interrupts {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
    #[cfg(windows)]
    inner: tokio::signal::windows::CtrlC,
}

impl Interrupts {
    #[cfg(unix)]
    fn listen() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        let inner = signal(SignalKind::interrupt()).context("Failed to listen for Ctrl-C")?;
        Ok(Self { inner })
    }

    #[cfg(windows)]
    fn listen() -> Result<Self> {
        let inner = tokio::signal::windows::ctrl_c().context("Failed to listen for Ctrl-C")?;
        Ok(Self { inner })
    }

    async fn recv(&mut self) {
        self.inner.recv().await;
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn print_history(session: &Session) {
    let conversation = session.conversation();
    if conversation.is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in conversation.messages() {
        println!("[{}] {}", message.role, message.content.trim());
    }
}
