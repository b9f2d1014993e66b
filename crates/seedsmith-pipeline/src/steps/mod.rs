//! Pipeline steps.
//!
//! Each step reads its inputs from disk, writes exactly one output file and
//! returns a [`StepReport`]. Steps run in the order of [`Step::ALL`]; later
//! steps read the intermediates written by earlier ones.

mod assemble;
mod lookup_ids;
mod prices;
mod product_retailers;
mod products;
mod retailers;
mod reviews;
mod specifications;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand_chacha::ChaCha8Rng;
use regex::Regex;
use tracing::warn;

use crate::errors::PipelineError;
use crate::model::{PipelineIssue, PipelineReport, StepReport};
use crate::output::read_input;
use crate::paths::PipelinePaths;
use crate::settings::PipelineSettings;

pub use assemble::{default_sections, SeedSection};

/// One stage of the seed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Brands,
    Categories,
    Specifications,
    Products,
    Retailers,
    Prices,
    ProductRetailers,
    Reviews,
    Assemble,
}

impl Step {
    /// Every step in execution order.
    pub const ALL: [Step; 9] = [
        Step::Brands,
        Step::Categories,
        Step::Specifications,
        Step::Products,
        Step::Retailers,
        Step::Prices,
        Step::ProductRetailers,
        Step::Reviews,
        Step::Assemble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Brands => "brands",
            Step::Categories => "categories",
            Step::Specifications => "specifications",
            Step::Products => "products",
            Step::Retailers => "retailers",
            Step::Prices => "prices",
            Step::ProductRetailers => "product-retailers",
            Step::Reviews => "reviews",
            Step::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('_', "-");
        Step::ALL
            .into_iter()
            .find(|step| step.name() == normalized)
            .ok_or_else(|| PipelineError::UnknownStep(value.to_string()))
    }
}

/// State handed to a running step.
pub struct StepContext<'a> {
    pub step: Step,
    pub paths: &'a PipelinePaths,
    pub settings: &'a PipelineSettings,
    pub rng: ChaCha8Rng,
    report: &'a mut PipelineReport,
}

impl<'a> StepContext<'a> {
    pub fn new(
        step: Step,
        paths: &'a PipelinePaths,
        settings: &'a PipelineSettings,
        rng: ChaCha8Rng,
        report: &'a mut PipelineReport,
    ) -> Self {
        Self {
            step,
            paths,
            settings,
            rng,
            report,
        }
    }

    /// Log a recoverable problem and keep it in the run report.
    pub fn warn(&mut self, code: &str, path: Option<&Path>, message: impl Into<String>) {
        let message = message.into();
        warn!(step = %self.step, code, detail = %message, "step warning");
        self.report.record_warning(PipelineIssue {
            level: "warning".to_string(),
            code: code.to_string(),
            step: self.step.name().to_string(),
            message,
            path: path.map(|path| path.display().to_string()),
        });
    }

    pub(crate) fn report_mut(&mut self) -> &mut PipelineReport {
        self.report
    }

    fn step_report(&self) -> StepReport {
        StepReport::new(self.step.name())
    }
}

/// Run a single step.
pub fn execute(ctx: &mut StepContext<'_>) -> Result<StepReport, PipelineError> {
    match ctx.step {
        Step::Brands => lookup_ids::run_brands(ctx),
        Step::Categories => lookup_ids::run_categories(ctx),
        Step::Specifications => specifications::run(ctx),
        Step::Products => products::run(ctx),
        Step::Retailers => retailers::run(ctx),
        Step::Prices => prices::run(ctx),
        Step::ProductRetailers => product_retailers::run(ctx),
        Step::Reviews => reviews::run(ctx),
        Step::Assemble => assemble::run(ctx),
    }
}

/// Fail unless positionally aligned inputs have the same number of records.
fn ensure_aligned(counts: &[(&Path, usize)]) -> Result<(), PipelineError> {
    let Some((_, first)) = counts.first() else {
        return Ok(());
    };
    if counts.iter().all(|(_, count)| count == first) {
        return Ok(());
    }
    Err(PipelineError::CountMismatch {
        counts: counts
            .iter()
            .map(|(path, count)| (file_label(path), *count))
            .collect(),
    })
}

/// Product ids of the merged products file, in file order.
fn read_product_ids(path: &Path) -> Result<Vec<u64>, PipelineError> {
    let content = read_input(path)?;
    let pattern = Regex::new(r"^\((\d+),")?;
    let ids: Vec<u64> = content
        .lines()
        .filter_map(|line| pattern.captures(line.trim()))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    if ids.is_empty() {
        return Err(empty_input(path, "product rows"));
    }
    Ok(ids)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn empty_input(path: &Path, what: &str) -> PipelineError {
    PipelineError::EmptyInput {
        path: path.to_path_buf(),
        what: what.to_string(),
    }
}

/// First characters of a record, for log messages.
fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(50).collect();
    if preview.len() < text.len() {
        preview.push_str("...");
    }
    preview
}
