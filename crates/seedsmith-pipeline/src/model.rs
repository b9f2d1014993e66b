use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    pub output: Option<String>,
    pub records_read: u64,
    pub records_written: u64,
    /// Rows written with a `NULL` placeholder or skipped after a warning.
    pub placeholders: u64,
    pub duration_ms: u64,
}

impl StepReport {
    pub fn new(step: &str) -> Self {
        Self {
            step: step.to_string(),
            output: None,
            records_read: 0,
            records_written: 0,
            placeholders: 0,
            duration_ms: 0,
        }
    }
}

/// Structured pipeline issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineIssue {
    pub level: String,
    pub code: String,
    pub step: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Report for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub started_at: String,
    pub seed: String,
    pub steps: Vec<StepReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_sha256: Option<String>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<PipelineIssue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PipelineIssue>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn new(run_id: String, seed: &str) -> Self {
        Self {
            run_id,
            started_at: chrono::Utc::now().to_rfc3339(),
            seed: seed.to_string(),
            steps: Vec::new(),
            output_path: None,
            output_sha256: None,
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_warning(&mut self, issue: PipelineIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn record_error(&mut self, issue: PipelineIssue) {
        self.errors.push(issue);
    }

    pub fn warning_count(&self, code: &str) -> u64 {
        self.warnings_by_code.get(code).copied().unwrap_or(0)
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.step == name)
    }
}
