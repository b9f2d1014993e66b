//! Seed pipeline for seedsmith.
//!
//! Reads the flat brand, category, product, price, retailer and review files
//! from `input_dir`, writes one intermediate per step into `work_dir` and
//! assembles the final SQL seed script. Random relationships are drawn from a
//! generator seeded per step, so a fixed seed reproduces the same script.

pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod paths;
pub mod random;
pub mod settings;
pub mod steps;

pub use engine::{PipelineEngine, PipelineResult};
pub use errors::PipelineError;
pub use model::{PipelineIssue, PipelineReport, StepReport};
pub use paths::PipelinePaths;
pub use settings::{CurrencySettings, PipelineSettings, PricingSettings, ReviewSettings};
pub use steps::{default_sections, SeedSection, Step};
