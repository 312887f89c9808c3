//! The linear chain walker. Steps run strictly sequentially in declared
//! order; the first failure blocks every later step, which is reported as a
//! dependency skip rather than a pass. A skip signal short-circuits the
//! remainder of the case without counting as a failure. Teardown and the
//! finish hook always run.

use slog::{error, info, warn, Logger};

use super::case::Case;
use super::error::StepError;
use super::middleware::{MiddlewareStack, StepContext};
use super::report::{CaseReport, StepStatus};

enum ChainState {
    Open,
    BlockedByFailure { step_name: String },
    BlockedBySkip { reason: String },
}

pub struct CaseRunner {
    stack: MiddlewareStack,
    logger: Logger,
}

impl CaseRunner {
    pub fn new(logger: Logger) -> Self {
        Self {
            stack: MiddlewareStack::standard(),
            logger,
        }
    }

    pub fn with_stack(logger: Logger, stack: MiddlewareStack) -> Self {
        Self { stack, logger }
    }

    pub fn run(&self, case: &Case, ctx: &mut StepContext) -> CaseReport {
        info!(
            self.logger,
            "Starting case {} (config '{}')\n{}",
            case.name,
            case.config.name(),
            case.scenario
        );
        let mut report = CaseReport::new(case.name.clone());

        let mut state = ChainState::Open;
        if let Some(setup) = &case.setup {
            match setup(ctx) {
                Ok(()) => {}
                Err(StepError::Skipped { reason }) => {
                    info!(self.logger, "Case setup skipped: {reason}");
                    state = ChainState::BlockedBySkip { reason };
                }
                Err(StepError::Failed(err)) => {
                    error!(self.logger, "Case setup failed: {:#}", err);
                    report.case_error = Some(format!("{err:#}"));
                    state = ChainState::BlockedByFailure {
                        step_name: "case setup".to_string(),
                    };
                }
            }
        }

        for step in &case.steps {
            match &state {
                ChainState::BlockedByFailure { step_name } => {
                    report.record(
                        &step.name,
                        StepStatus::DependencySkipped {
                            blocked_on: step_name.clone(),
                        },
                    );
                }
                ChainState::BlockedBySkip { reason } => {
                    report.record(
                        &step.name,
                        StepStatus::Skipped {
                            reason: reason.clone(),
                        },
                    );
                }
                ChainState::Open => {
                    let result = self.stack.run(step, ctx);
                    let duration = ctx.duration_of(&step.name).unwrap_or_default();
                    match result {
                        Ok(()) => report.record(&step.name, StepStatus::Passed { duration }),
                        Err(StepError::Skipped { reason }) => {
                            report.record(
                                &step.name,
                                StepStatus::Skipped {
                                    reason: reason.clone(),
                                },
                            );
                            state = ChainState::BlockedBySkip {
                                reason: format!("case short-circuited at {}: {reason}", step.name),
                            };
                        }
                        Err(StepError::Failed(err)) => {
                            report.record(
                                &step.name,
                                StepStatus::Failed {
                                    message: format!("{err:#}"),
                                    duration,
                                },
                            );
                            state = ChainState::BlockedByFailure {
                                step_name: step.name.clone(),
                            };
                        }
                    }
                }
            }
        }

        // Teardown runs whatever happened above; its failures are logged
        // but never override step outcomes.
        if let Some(teardown) = &case.teardown {
            if let Err(err) = teardown(ctx) {
                warn!(self.logger, "Case teardown failed: {err}");
            }
        }

        let total: f64 = ctx.timings().iter().map(|(_, d)| d.as_secs_f64()).sum();
        for (name, duration) in ctx.timings() {
            info!(self.logger, "{name} took {:.2}s", duration.as_secs_f64());
        }
        info!(
            self.logger,
            "Finished case {} in {:.2}s ({})",
            case.name,
            total,
            if report.is_failure_free() {
                "passed"
            } else {
                "failed"
            }
        );
        report
    }
}
