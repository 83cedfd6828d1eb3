pub mod context;
pub mod state;
pub mod step;

use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub use context::SessionContext;
pub use state::{StepRecord, StepStatus, WorkflowResult};
pub use step::{Criticality, StepAction, WorkflowStep};

/// Execute `steps` strictly in order against one session.
///
/// A failed critical step aborts the run; the remaining steps never execute
/// and get no log record. A failed optional step is recorded and execution
/// continues. The run is a success exactly when no critical step failed.
/// The session is closed before returning on every path.
pub async fn run_workflow(steps: Vec<WorkflowStep>, ctx: SessionContext) -> WorkflowResult {
    let ctx = Arc::new(ctx);
    let run_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let run_start = Instant::now();

    info!("starting workflow run {} ({} steps)", run_id, steps.len());

    let mut records = Vec::with_capacity(steps.len());
    let mut aborted_at = None;
    let mut critical_failure = false;

    for step in &steps {
        info!("step {:?} ({:?})", step.name, step.criticality);
        let step_start = Instant::now();
        let outcome = (step.action)(Arc::clone(&ctx)).await;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                records.push(StepRecord {
                    name: step.name.clone(),
                    status: StepStatus::Passed,
                    duration_ms,
                });
            }
            Err(e) => {
                records.push(StepRecord {
                    name: step.name.clone(),
                    status: StepStatus::Failed {
                        error: e.to_string(),
                    },
                    duration_ms,
                });
                match step.criticality {
                    Criticality::Critical => {
                        error!("critical step {:?} failed: {}", step.name, e);
                        aborted_at = Some(step.name.clone());
                        critical_failure = true;
                        break;
                    }
                    Criticality::Optional => {
                        warn!("optional step {:?} failed, continuing: {}", step.name, e);
                    }
                }
            }
        }
    }

    ctx.close().await;

    let result = WorkflowResult {
        run_id,
        started_at,
        steps: records,
        aborted_at,
        success: !critical_failure,
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };
    info!(
        "workflow run {} finished: success={}",
        result.run_id, result.success
    );
    result
}
