//! Single-shot question answering (`cardwise ask`).
//!
//! Runs one pipeline turn with an empty history and prints the final
//! response followed by the relevant documents. With `--json` the whole
//! [`PipelineOutput`] is printed instead.

use anyhow::{bail, Result};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::pipeline::{Pipeline, PipelineOutput, RunOptions};
use crate::progress::ProgressMode;
use crate::session::{Session, TurnOutcome};

/// Merge CLI overrides onto the configured retrieval defaults.
pub fn run_options(config: &Config, top_k: Option<usize>, no_refine: bool) -> Result<RunOptions> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        bail!("--top-k must be >= 1");
    }
    Ok(RunOptions {
        top_k,
        refine: config.retrieval.refine && !no_refine,
    })
}

pub async fn run_ask(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    no_refine: bool,
    json: bool,
    progress: ProgressMode,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let options = run_options(config, top_k, no_refine)?;
    let mut session = Session::new(Pipeline::from_config(config)?, options)
        .with_timeout(Duration::from_secs(config.retrieval.query_timeout_secs));
    let reporter = progress.reporter();

    let started = Instant::now();
    match session.ask(query, None, reporter.as_ref()).await {
        TurnOutcome::Answered(output) => {
            eprintln!(
                "Processed in {:.2} seconds.",
                started.elapsed().as_secs_f64()
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_output(&output, true);
            }
            Ok(())
        }
        TurnOutcome::Failed(err) => Err(err.into()),
    }
}

/// Print the final response and, optionally, the relevant documents.
pub fn print_output(output: &PipelineOutput, show_results: bool) {
    if output.refined_query != output.query {
        println!("Refined query: {}", output.refined_query);
        println!();
    }

    println!("### Final Response");
    println!("{}", output.answer.trim());

    if !show_results {
        return;
    }

    println!();
    println!("### Relevant Documents");
    if output.results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, result) in output.results.iter().enumerate() {
        println!(
            "{}. {} (Score: {:.4})",
            i + 1,
            result.filename,
            result.score
        );
        println!("    text: \"{}\"", result.text.replace('\n', " ").trim());
    }
}
