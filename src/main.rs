//! # CardWise CLI (`cardwise`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cardwise ask "<query>"` | Answer one question about credit card terms |
//! | `cardwise chat` | Interactive session with conversation history |
//! | `cardwise cards` | Browse the credit card catalog |
//! | `cardwise terms` | Show terms of use and disclaimer |
//! | `cardwise completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! export OPENAI_API_KEY=... PINECONE_API_KEY=...
//!
//! cardwise ask "Which HSBC card has no annual fee?" --top-k 3
//! cardwise ask "best travel card" --no-refine --json
//! cardwise chat --show-results
//! cardwise cards --bank "hang seng"
//! ```

use cardwise::{ask, catalog, chat, config, progress::ProgressMode};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CardWise: compare Hong Kong credit cards and ask about their terms.
///
/// Pipeline commands read a TOML configuration file given by `--config`.
/// See `config/cardwise.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cardwise",
    about = "CardWise, a retrieval-augmented assistant for Hong Kong credit card terms",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cardwise.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question.
    ///
    /// Refines the query (unless `--no-refine`), retrieves the closest
    /// passages from the vector index, and prints a grounded answer with
    /// the documents it drew on.
    Ask {
        /// The question to ask.
        query: String,

        /// Number of passages to retrieve. Defaults to `[retrieval].top_k`.
        #[arg(long)]
        top_k: Option<usize>,

        /// Embed the query as typed instead of rewriting it first.
        #[arg(long)]
        no_refine: bool,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Start an interactive chat session.
    ///
    /// Each answer takes the earlier turns into account. History lasts
    /// until the session ends.
    Chat {
        /// Number of passages to retrieve per question.
        #[arg(long)]
        top_k: Option<usize>,

        /// Embed queries as typed instead of rewriting them first.
        #[arg(long)]
        no_refine: bool,

        /// Print the relevant documents under every answer.
        #[arg(long)]
        show_results: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Browse the credit card catalog.
    Cards {
        /// Only show cards from banks whose name contains this text.
        #[arg(long)]
        bank: Option<String>,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show terms of use and disclaimer.
    Terms,

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardwise=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Cards { bank, json } => {
            return catalog::run_cards(bank.as_deref(), *json);
        }
        Commands::Terms => {
            catalog::run_terms();
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "cardwise",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask {
            query,
            top_k,
            no_refine,
            json,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ask::run_ask(&cfg, &query, top_k, no_refine, json, progress).await?;
        }
        Commands::Chat {
            top_k,
            no_refine,
            show_results,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            chat::run_chat(&cfg, top_k, no_refine, show_results, progress).await?;
        }
        Commands::Cards { .. } | Commands::Terms | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
