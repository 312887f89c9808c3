//! Aggregated outcomes, rendered as the aligned summary table operators
//! grep after a CI run.

use std::fmt::{Display, Formatter, Result};
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum StepStatus {
    Passed {
        duration: Duration,
    },
    Failed {
        message: String,
        duration: Duration,
    },
    Skipped {
        reason: String,
    },
    /// Not executed because an earlier step failed. Reported explicitly so
    /// it can never be mistaken for a pass.
    DependencySkipped {
        blocked_on: String,
    },
}

#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
}

#[derive(Clone, Debug, Default)]
pub struct CaseReport {
    pub case_name: String,
    outcomes: Vec<StepOutcome>,
    /// Failure outside any step (case setup), which blocks the whole case.
    pub case_error: Option<String>,
}

impl CaseReport {
    pub fn new(case_name: impl Into<String>) -> Self {
        Self {
            case_name: case_name.into(),
            outcomes: Vec::new(),
            case_error: None,
        }
    }

    pub fn record(&mut self, name: impl Into<String>, status: StepStatus) {
        self.outcomes.push(StepOutcome {
            name: name.into(),
            status,
        });
    }

    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    pub fn status_of(&self, step_name: &str) -> Option<&StepStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == step_name)
            .map(|o| &o.status)
    }

    pub fn is_failure_free(&self) -> bool {
        self.case_error.is_none()
            && !self
                .outcomes
                .iter()
                .any(|o| matches!(o.status, StepStatus::Failed { .. }))
    }
}

fn min_width(outcomes: &[StepOutcome]) -> usize {
    outcomes
        .iter()
        .map(|o| o.name.chars().count())
        .max()
        .unwrap_or(10)
}

impl Display for CaseReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let w = min_width(&self.outcomes);
        writeln!(f, "Case {}", self.case_name)?;
        if let Some(err) = &self.case_error {
            writeln!(f, "  case setup failed -- {err}")?;
        }
        for outcome in &self.outcomes {
            match &outcome.status {
                StepStatus::Passed { duration } => writeln!(
                    f,
                    "  {:<w$}  PASSED in {:>6.2}s",
                    outcome.name,
                    duration.as_secs_f64()
                )?,
                StepStatus::Failed { message, duration } => writeln!(
                    f,
                    "  {:<w$}  FAILED in {:>6.2}s -- {}",
                    outcome.name,
                    duration.as_secs_f64(),
                    message
                )?,
                StepStatus::Skipped { reason } => {
                    writeln!(f, "  {:<w$}  SKIPPED -- {}", outcome.name, reason)?
                }
                StepStatus::DependencySkipped { blocked_on } => writeln!(
                    f,
                    "  {:<w$}  SKIPPED -- dependency {} failed",
                    outcome.name, blocked_on
                )?,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct HarnessReport {
    cases: Vec<CaseReport>,
}

impl HarnessReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: CaseReport) {
        self.cases.push(report);
    }

    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    pub fn is_failure_free(&self) -> bool {
        self.cases.iter().all(CaseReport::is_failure_free)
    }

    pub fn failed_case_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.is_failure_free()).count()
    }
}

impl Display for HarnessReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "{:=^60}", " Summary ")?;
        if self.cases.is_empty() {
            writeln!(f, "No case outcomes were reported.")?;
        }
        for case in &self.cases {
            write!(f, "{case}")?;
        }
        let failed = self.failed_case_count();
        if failed == 0 {
            writeln!(
                f,
                "{:.^60}",
                format!(" All {} cases passed! ", self.cases.len())
            )?;
        } else {
            writeln!(f, "{:.^60}", format!(" Cases failed: {failed} "))?;
        }
        write!(f, "{:=^60}", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_skips_are_not_passes() {
        let mut report = CaseReport::new("Case_Deploy__Config_demo");
        report.record(
            "Case_Deploy__Config_demo.Step000_setup",
            StepStatus::Passed {
                duration: Duration::from_millis(10),
            },
        );
        report.record(
            "Case_Deploy__Config_demo.Step001_deploy",
            StepStatus::Failed {
                message: "boom".to_string(),
                duration: Duration::from_millis(5),
            },
        );
        report.record(
            "Case_Deploy__Config_demo.Step002_verify",
            StepStatus::DependencySkipped {
                blocked_on: "Case_Deploy__Config_demo.Step001_deploy".to_string(),
            },
        );
        assert!(!report.is_failure_free());
        let rendered = report.to_string();
        assert!(rendered.contains("FAILED"));
        assert!(rendered.contains("SKIPPED -- dependency"));
        assert_eq!(rendered.matches("PASSED").count(), 1);
    }

    #[test]
    fn harness_report_counts_failed_cases() {
        let mut harness = HarnessReport::new();
        harness.push(CaseReport::new("Case_A__Config_x"));
        let mut failing = CaseReport::new("Case_B__Config_x");
        failing.record(
            "Case_B__Config_x.Step000_setup",
            StepStatus::Failed {
                message: "nope".to_string(),
                duration: Duration::ZERO,
            },
        );
        harness.push(failing);
        assert!(!harness.is_failure_free());
        assert_eq!(harness.failed_case_count(), 1);
        assert!(harness.to_string().contains("Cases failed: 1"));
    }
}
