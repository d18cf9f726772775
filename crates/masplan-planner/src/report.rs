//! Run report: structured metadata for one plan execution.

use crate::plan::Plan;
use chrono::{DateTime, Utc};
use masplan_core::{Resource, ResourceTuple, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub label: String,
    pub input_type: String,
    pub output_type: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub total_wall_ms: u64,
    pub steps: Vec<StepRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Success,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StepRecord {
    pub task: String,
    pub binding: String,
    pub status: StepState,
    pub wall_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// A pending report with one record per plan step.
    pub fn new(label: &str, plan: &Plan) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            input_type: plan.input_type().to_string(),
            output_type: plan.output_type().to_string(),
            started: Utc::now(),
            ended: None,
            outcome: Outcome::Pending,
            total_wall_ms: 0,
            steps: plan
                .steps
                .iter()
                .map(|s| StepRecord {
                    task: s.name().to_string(),
                    binding: s.to_string(),
                    status: StepState::Pending,
                    wall_ms: 0,
                    error: None,
                })
                .collect(),
        }
    }

    pub fn finish_step(&mut self, index: usize, wall_ms: u64, error: Option<String>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.status = if error.is_some() {
                StepState::Failed
            } else {
                StepState::Success
            };
            step.wall_ms = wall_ms;
            step.error = error;
        }
    }

    pub fn finalize(&mut self, outcome: Outcome) {
        let ended = Utc::now();
        self.outcome = outcome;
        self.total_wall_ms = (ended - self.started).num_milliseconds().max(0) as u64;
        self.ended = Some(ended);
    }

    pub fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepState::Success)
            .count()
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "| {} | {} | {} -> {} | {}/{} | {} |",
            self.run_id,
            self.label,
            self.input_type,
            self.output_type,
            self.completed(),
            self.steps.len(),
            self.outcome,
        )
    }
}

/// Execute `plan` from `inputs`, recording every step into a fresh report.
/// The report is returned alongside the outcome either way.
pub fn execute_with_report(
    plan: &Plan,
    label: &str,
    inputs: Vec<(ResourceTuple, Resource)>,
) -> (RunReport, Result<Resource>) {
    let mut report = RunReport::new(label, plan);
    let result = plan.execute_observed(inputs, |event| {
        report.finish_step(
            event.index,
            event.elapsed.as_millis() as u64,
            event.error.map(ToString::to_string),
        );
    });
    report.finalize(if result.is_ok() {
        Outcome::Success
    } else {
        Outcome::Failure
    });
    tracing::info!(run_id = %report.run_id, outcome = %report.outcome, "run finished");
    (report, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DependentTask, Task};
    use std::sync::Arc;

    fn plan(fail: bool) -> Plan {
        let write = Task::new("WriteSentence", "topic", "sentence", |_: &Resource| {
            Ok(Resource::new("sentence").with("text", "cats purr"))
        });
        let grow = Task::new("Expand", "sentence", "paragraph", move |_: &Resource| {
            if fail {
                Err("no words left".into())
            } else {
                Ok(Resource::new("paragraph"))
            }
        });
        Plan::new(
            vec![
                DependentTask::generic(Arc::new(write)),
                DependentTask::generic(Arc::new(grow)),
            ],
            "topic".into(),
            "paragraph".into(),
        )
    }

    #[test]
    fn successful_run_marks_every_step() {
        let plan = plan(false);
        let seed = vec![(plan.input.clone(), Resource::new("topic"))];
        let (report, result) = execute_with_report(&plan, "cats", seed);
        assert!(result.is_ok());
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.completed(), 2);
        assert!(report.ended.is_some());
    }

    #[test]
    fn failed_run_keeps_later_steps_pending() {
        let plan = plan(true);
        let seed = vec![(plan.input.clone(), Resource::new("topic"))];
        let (report, result) = execute_with_report(&plan, "cats", seed);
        assert!(result.is_err());
        assert_eq!(report.outcome, Outcome::Failure);
        assert_eq!(report.steps[0].status, StepState::Success);
        assert_eq!(report.steps[1].status, StepState::Failed);
        assert!(report.steps[1].error.as_deref().unwrap().contains("Expand"));
    }

    #[test]
    fn yaml_and_summary_name_the_run() {
        let report = RunReport::new("cats", &plan(false));
        let yaml = report.to_yaml();
        assert!(yaml.contains(&report.run_id));
        assert!(yaml.contains("pending"));
        let line = report.summary_line();
        assert!(line.contains("topic -> paragraph"));
        assert!(line.contains("0/2"));
    }
}
