use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use dermatrix_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::{info, warn};

use super::session_keys;
use crate::error::DetectionError;
use crate::imaging::{self, NormalizedImage};

/// Decodes the uploaded photo and crops/scales it to the model input size
pub struct NormalizeImageTask {
    input_size: u32,
}

impl NormalizeImageTask {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }
}

#[async_trait]
impl Task for NormalizeImageTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let encoded: String = context.require(session_keys::UPLOAD).await?;
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| DetectionError::InvalidImage(format!("upload is not valid base64: {}", e)))?;

        info!("Normalizing upload of {} bytes", bytes.len());

        let size = self.input_size;
        let normalized: NormalizedImage =
            tokio::task::spawn_blocking(move || imaging::normalize_upload(&bytes, size))
                .await
                .map_err(|e| GraphError::TaskExecutionFailed(e.to_string()))?
                .inspect_err(|e| warn!("Rejected upload: {}", e))?;

        context.set(session_keys::NORMALIZED_IMAGE, &normalized).await?;
        context.remove(session_keys::UPLOAD).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(format!("Image normalized to {}x{}", normalized.width, normalized.height)),
        ))
    }
}
