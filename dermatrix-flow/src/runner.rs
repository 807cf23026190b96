//! FlowRunner: loads a session, executes it against the graph it belongs to, and
//! persists the updated session back to storage.
//!
//! HTTP handlers hold one `FlowRunner` in their shared state and call
//! [`FlowRunner::run`] once per request. Each session names its graph through
//! `Session::graph_id`, so a single runner serves every workflow registered in
//! its [`GraphStorage`].
//!
//! A failed step is not persisted: the stored session keeps the state it had
//! before the call, and the next request starts from there.

use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{GraphError, Result},
    graph::ExecutionResult,
    storage::{GraphStorage, SessionStorage},
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graphs: Arc<dyn GraphStorage>,
    sessions: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(graphs: Arc<dyn GraphStorage>, sessions: Arc<dyn SessionStorage>) -> Self {
        Self { graphs, sessions }
    }

    /// Execute the session identified by `session_id` and persist the result.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| GraphError::SessionNotFound(session_id.to_string()))?;

        let graph = self
            .graphs
            .get(&session.graph_id)
            .await?
            .ok_or_else(|| GraphError::GraphNotFound(session.graph_id.clone()))?;

        debug!(
            "Running session {} on graph {} from task {}",
            session.id, graph.id, session.current_task_id
        );
        let snapshot = session.context.snapshot().await;
        match graph.execute_session(&mut session).await {
            Ok(result) => {
                self.sessions.save(session).await?;
                Ok(result)
            }
            Err(e) => {
                // The stored session shares this context; undo partial writes.
                session.context.restore(snapshot).await;
                Err(e)
            }
        }
    }
}
