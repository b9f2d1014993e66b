use std::path::PathBuf;

use thiserror::Error;

use crate::model::PipelineReport;
use crate::steps::Step;

/// Errors emitted by pipeline steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("no {what} found in {}", .path.display())]
    EmptyInput { path: PathBuf, what: String },
    #[error("record counts differ: {}", format_counts(.counts))]
    CountMismatch { counts: Vec<(String, usize)> },
    #[error("invalid input in {}: {message}", .path.display())]
    InvalidInput { path: PathBuf, message: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("core error: {0}")]
    Core(#[from] seedsmith_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("settings encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("step {step} failed: {source}")]
    Failed {
        step: Step,
        source: Box<PipelineError>,
        report: Box<PipelineReport>,
    },
}

fn format_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{name}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
