//! Query pipeline progress reporting.
//!
//! The pipeline reports coarse stage markers as it moves from refinement to
//! synthesis. Reporters decide how (or whether) to show them. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// Coarse stage of a pipeline run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    RefineStarted,
    EmbeddingStarted,
    SearchStarted,
    SynthesisStarted,
    Done,
}

impl Stage {
    /// Approximate completion percentage when this stage begins.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::RefineStarted => 0,
            Stage::EmbeddingStarted => 25,
            Stage::SearchStarted => 50,
            Stage::SynthesisStarted => 75,
            Stage::Done => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::RefineStarted => "Refining query...",
            Stage::EmbeddingStarted => "Generating embeddings...",
            Stage::SearchStarted => "Querying vector index...",
            Stage::SynthesisStarted => "Generating response...",
            Stage::Done => "Done!",
        }
    }

    /// Stable identifier used in JSON output.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::RefineStarted => "refine",
            Stage::EmbeddingStarted => "embedding",
            Stage::SearchStarted => "search",
            Stage::SynthesisStarted => "synthesis",
            Stage::Done => "done",
        }
    }
}

/// Receives stage markers from the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, stage: Stage);
}

impl<F> ProgressReporter for F
where
    F: Fn(Stage) + Send + Sync,
{
    fn report(&self, stage: Stage) {
        self(stage)
    }
}

/// Human-friendly progress on stderr: "[ 25%] Generating embeddings...".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, stage: Stage) {
        let line = format!("[{:>3}%] {}\n", stage.percent(), stage.label());
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, stage: Stage) {
        let obj = serde_json::json!({
            "event": "progress",
            "stage": stage.key(),
            "percent": stage.percent(),
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _stage: Stage) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
