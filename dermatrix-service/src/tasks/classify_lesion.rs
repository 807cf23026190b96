use async_trait::async_trait;
use dermatrix_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::{error, info};

use super::session_keys;
use crate::classifier::{ClassificationResult, Classifier};
use crate::imaging::NormalizedImage;

/// Runs the classifier on the normalized image and keeps the top label
pub struct ClassifyLesionTask {
    classifier: Arc<dyn Classifier>,
}

impl ClassifyLesionTask {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Task for ClassifyLesionTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let image: NormalizedImage = context.require(session_keys::NORMALIZED_IMAGE).await?;

        let classifier = self.classifier.clone();
        let probabilities = tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .map_err(|e| GraphError::TaskExecutionFailed(e.to_string()))?
            .inspect_err(|e| error!("Classification failed: {}", e))?;

        let result = ClassificationResult::from_probabilities(probabilities)?;
        info!("Predicted {} (score {:.4})", result.label, result.score);

        context.set(session_keys::CLASSIFICATION, &result).await?;
        context.remove(session_keys::NORMALIZED_IMAGE).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(format!("Classified as {}", result.label)),
        ))
    }
}
