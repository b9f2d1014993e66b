use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::model::{PipelineIssue, PipelineReport};
use crate::paths::PipelinePaths;
use crate::random::step_rng;
use crate::settings::PipelineSettings;
use crate::steps::{self, Step, StepContext};

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Final script path, set once the assemble step has run.
    pub output_path: Option<PathBuf>,
    pub report: PipelineReport,
}

/// Runs pipeline steps against one set of settings.
#[derive(Debug, Clone)]
pub struct PipelineEngine {
    settings: PipelineSettings,
    paths: PipelinePaths,
    run_id: Option<String>,
}

impl PipelineEngine {
    pub fn new(settings: PipelineSettings) -> Result<Self, PipelineError> {
        settings.validate()?;
        let paths = PipelinePaths::from_settings(&settings);
        Ok(Self {
            settings,
            paths,
            run_id: None,
        })
    }

    /// Reuse an existing run id, e.g. the one of the run directory.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    /// Run every step in order.
    pub fn run(&self) -> Result<PipelineResult, PipelineError> {
        self.run_steps(&Step::ALL)
    }

    pub fn run_step(&self, step: Step) -> Result<PipelineResult, PipelineError> {
        self.run_steps(&[step])
    }

    /// Run `steps` in the given order, stopping at the first failure.
    ///
    /// A failing step is recorded in the report, which is returned inside
    /// [`PipelineError::Failed`].
    pub fn run_steps(&self, steps: &[Step]) -> Result<PipelineResult, PipelineError> {
        let start = Instant::now();
        let run_id = self
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut report = PipelineReport::new(run_id.clone(), &self.settings.seed);

        info!(
            event = "pipeline_started",
            run_id = %run_id,
            steps = steps.len(),
            input_dir = %self.paths.input_dir.display(),
            work_dir = %self.paths.work_dir.display()
        );

        for &step in steps {
            let step_start = Instant::now();
            info!(event = "step_started", step = %step);

            let rng = step_rng(&self.settings.seed, step.name());
            let mut ctx = StepContext::new(step, &self.paths, &self.settings, rng, &mut report);
            match steps::execute(&mut ctx) {
                Ok(mut step_report) => {
                    step_report.duration_ms = step_start.elapsed().as_millis() as u64;
                    info!(
                        event = "step_completed",
                        step = %step,
                        records_read = step_report.records_read,
                        records_written = step_report.records_written,
                        placeholders = step_report.placeholders,
                        duration_ms = step_report.duration_ms
                    );
                    report.steps.push(step_report);
                }
                Err(err) => {
                    report.record_error(PipelineIssue {
                        level: "error".to_string(),
                        code: "step_failed".to_string(),
                        step: step.name().to_string(),
                        message: err.to_string(),
                        path: None,
                    });
                    report.duration_ms = start.elapsed().as_millis() as u64;
                    warn!(event = "step_failed", step = %step, error = %err);
                    return Err(PipelineError::Failed {
                        step,
                        source: Box::new(err),
                        report: Box::new(report),
                    });
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            event = "pipeline_completed",
            run_id = %run_id,
            steps = report.steps.len(),
            warnings = report.warnings.len(),
            duration_ms = report.duration_ms
        );

        Ok(PipelineResult {
            output_path: report.output_path.as_ref().map(PathBuf::from),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let settings = PipelineSettings {
            seed: String::new(),
            ..PipelineSettings::default()
        };
        assert!(matches!(
            PipelineEngine::new(settings),
            Err(PipelineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn failed_step_carries_its_report() {
        let root = std::env::temp_dir().join(format!("seedsmith_engine_{}", uuid::Uuid::new_v4()));
        let settings = PipelineSettings {
            input_dir: root.join("in"),
            work_dir: root.join("work"),
            ..PipelineSettings::default()
        };
        let engine = PipelineEngine::new(settings).expect("engine");
        match engine.run_step(Step::Retailers) {
            Err(PipelineError::Failed {
                step,
                source,
                report,
            }) => {
                assert_eq!(step, Step::Retailers);
                assert!(matches!(*source, PipelineError::MissingInput(_)));
                assert_eq!(report.errors.len(), 1);
                assert_eq!(report.errors[0].step, "retailers");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
