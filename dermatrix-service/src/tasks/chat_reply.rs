use async_trait::async_trait;
use dermatrix_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::session_keys;
use crate::assistant::Assistant;

/// Appends the user's message to the session log and answers it
pub struct ChatReplyTask {
    assistant: Arc<dyn Assistant>,
}

impl ChatReplyTask {
    pub fn new(assistant: Arc<dyn Assistant>) -> Self {
        Self { assistant }
    }
}

#[async_trait]
impl Task for ChatReplyTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let prompt: String = context.require(session_keys::USER_INPUT).await?;

        let history = context.get_all_messages().await;
        info!("Chat turn with {} prior messages", history.len());

        let reply = self
            .assistant
            .reply(&history, &prompt)
            .await
            .map_err(|e| GraphError::TaskExecutionFailed(e.to_string()))?;

        context.remove(session_keys::USER_INPUT).await;
        context.add_user_message(prompt).await;
        context.add_assistant_message(reply.clone()).await;

        Ok(TaskResult::new(Some(reply), NextAction::WaitForInput))
    }
}
