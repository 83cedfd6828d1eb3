use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Terminal status of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed { error: String },
}

/// One line of the execution log. Only steps that actually ran get a
/// record; steps behind an abort point are absent, not marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
}

impl StepRecord {
    pub fn passed(&self) -> bool {
        matches!(self.status, StepStatus::Passed)
    }
}

/// Outcome of a whole workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    /// Name of the critical step whose failure stopped the run, if any.
    pub aborted_at: Option<String>,
    /// True exactly when no critical step failed. Optional-step failures
    /// never clear it.
    pub success: bool,
    pub total_duration_ms: u64,
}

impl WorkflowResult {
    pub fn counts(&self) -> (usize, usize) {
        self.steps
            .iter()
            .fold((0, 0), |(p, f), s| match s.status {
                StepStatus::Passed => (p + 1, f),
                StepStatus::Failed { .. } => (p, f + 1),
            })
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", "Workflow summary".bold());
        for step in &self.steps {
            match &step.status {
                StepStatus::Passed => {
                    println!(
                        "  {} {} ({} ms)",
                        "PASS".green().bold(),
                        step.name,
                        step.duration_ms
                    );
                }
                StepStatus::Failed { error } => {
                    println!(
                        "  {} {} ({} ms): {}",
                        "FAIL".red().bold(),
                        step.name,
                        step.duration_ms,
                        error
                    );
                }
            }
        }
        if let Some(aborted) = &self.aborted_at {
            println!("  {} aborted at {}", "STOP".red().bold(), aborted);
        }
        let (passed, failed) = self.counts();
        let verdict = if self.success {
            "SUCCESS".green().bold()
        } else {
            "FAILURE".red().bold()
        };
        println!(
            "  {} {} passed, {} failed, {} ms total",
            verdict, passed, failed, self.total_duration_ms
        );
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: StepStatus) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            status,
            duration_ms: 10,
        }
    }

    #[test]
    fn test_counts() {
        let result = WorkflowResult {
            run_id: "r".to_string(),
            started_at: Utc::now(),
            steps: vec![
                record("a", StepStatus::Passed),
                record("b", StepStatus::Failed { error: "x".to_string() }),
                record("c", StepStatus::Passed),
            ],
            aborted_at: None,
            success: true,
            total_duration_ms: 30,
        };
        assert_eq!(result.counts(), (2, 1));
    }

    #[test]
    fn test_status_serialization() {
        let status = StepStatus::Failed { error: "boom".to_string() };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#"{"type":"failed","error":"boom"}"#);
    }
}
