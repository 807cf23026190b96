use async_trait::async_trait;
use dermatrix_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::session_keys;
use crate::classifier::ClassificationResult;
use crate::config::ConfidenceMode;
use crate::models::DetectionReport;

/// Joins the prediction with the condition registry into the final report
pub struct LookupConditionTask {
    confidence: ConfidenceMode,
}

impl LookupConditionTask {
    pub fn new(confidence: ConfidenceMode) -> Self {
        Self { confidence }
    }
}

#[async_trait]
impl Task for LookupConditionTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let result: ClassificationResult = context.require(session_keys::CLASSIFICATION).await?;
        let session_id: String = context.get(session_keys::SESSION_ID).await.unwrap_or_default();

        let report = DetectionReport::new(session_id, &result, self.confidence);
        info!(
            "Report ready: {} (confidence {}%, contagious: {})",
            report.condition, report.confidence, report.contagious
        );

        let response = format!("Detected condition: {}", report.condition);
        context.set(session_keys::REPORT, &report).await?;

        Ok(TaskResult::new_with_status(
            Some(response),
            NextAction::End,
            Some("Detection complete".to_string()),
        ))
    }
}
