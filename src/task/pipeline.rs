use log::debug;

use crate::error::{LionpError, Result};
use crate::task::stages::standard_steps;
use crate::task::{ReleaseContext, StageOutcome, StageReport, TaskStep};

/// Runs the release stages in order, stopping at the first failure.
#[derive(Debug)]
pub struct ReleasePipeline {
    steps: Vec<TaskStep>,
}

impl ReleasePipeline {
    pub fn standard() -> Self {
        ReleasePipeline {
            steps: standard_steps(),
        }
    }

    pub fn steps(&self) -> &[TaskStep] {
        &self.steps
    }

    /// Run every step, reporting each one to `on_report` as it finishes.
    ///
    /// A failure after the version bump rolls the bump back unless the
    /// package already reached the registry. The returned error then carries
    /// the rollback outcome.
    pub fn run(
        &self,
        ctx: &mut ReleaseContext,
        mut on_report: impl FnMut(&StageReport),
    ) -> Result<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let outcome = match evaluate(step, ctx) {
                Ok(outcome) => outcome,
                Err(error) => {
                    let report = StageReport::new(step.stage, StageOutcome::Failed(error.to_string()));
                    on_report(&report);
                    return Err(roll_back_after(ctx, error));
                }
            };

            debug!("{}: {:?}", step.stage, outcome);
            let report = StageReport::new(step.stage, outcome);
            on_report(&report);
            reports.push(report);
        }

        Ok(reports)
    }
}

fn evaluate(step: &TaskStep, ctx: &mut ReleaseContext) -> Result<StageOutcome> {
    if !(step.enabled)(ctx) {
        return Ok(StageOutcome::Disabled);
    }
    if let Some(reason) = (step.skip)(ctx)? {
        return Ok(StageOutcome::Skipped(reason));
    }
    (step.action)(ctx)?;
    Ok(StageOutcome::Completed)
}

fn roll_back_after(ctx: &ReleaseContext, error: LionpError) -> LionpError {
    if !ctx.version_bumped || ctx.published || ctx.options.preview {
        return error;
    }

    let outcome = ctx.rollback.run();
    let stderr = error.stderr().unwrap_or_default().to_string();
    LionpError::external_with_stderr(format!("{}\n\n{}", error, outcome), stderr)
}
