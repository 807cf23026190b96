use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    context::Context,
    error::{GraphError, Result},
    storage::Session,
    task::{NextAction, Task, TaskResult},
};

/// Upper bound on tasks chained by `ContinueAndExecute` within one call
const MAX_CHAINED_STEPS: usize = 64;

/// A graph of tasks that can be executed
pub struct Graph {
    pub id: String,
    tasks: DashMap<String, Arc<dyn Task>>,
    edges: HashMap<String, String>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: DashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Execute the session's current task, following `ContinueAndExecute` chains,
    /// and leave the session positioned where the next call should resume.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        for _ in 0..MAX_CHAINED_STEPS {
            let result = self
                .execute_single_task(&session.current_task_id, session.context.clone())
                .await?;

            session.status_message = result.status_message.clone();

            match result.next_action {
                NextAction::ContinueAndExecute => match self.find_next_task(&result.task_id) {
                    Some(next_task_id) => {
                        debug!("{} -> {}", result.task_id, next_task_id);
                        session.current_task_id = next_task_id;
                    }
                    None => {
                        return Ok(ExecutionResult {
                            response: result.response,
                            status: ExecutionStatus::WaitingForInput,
                        });
                    }
                },
                NextAction::Continue => {
                    if let Some(next_task_id) = self.find_next_task(&result.task_id) {
                        session.current_task_id = next_task_id;
                    }
                    return Ok(ExecutionResult {
                        response: result.response,
                        status: ExecutionStatus::WaitingForInput,
                    });
                }
                NextAction::WaitForInput => {
                    return Ok(ExecutionResult {
                        response: result.response,
                        status: ExecutionStatus::WaitingForInput,
                    });
                }
                NextAction::End => {
                    return Ok(ExecutionResult {
                        response: result.response,
                        status: ExecutionStatus::Completed,
                    });
                }
            }
        }

        warn!(
            "Graph {} exceeded {} chained steps at task {}",
            self.id, MAX_CHAINED_STEPS, session.current_task_id
        );
        Err(GraphError::TaskExecutionFailed(format!(
            "graph {} did not yield within {} steps",
            self.id, MAX_CHAINED_STEPS
        )))
    }

    /// Execute a single task without following any next action
    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .get_task(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        let mut result = task.run(context).await?;
        result.task_id = task_id.to_string();

        Ok(result)
    }

    pub fn find_next_task(&self, current_task_id: &str) -> Option<String> {
        self.edges.get(current_task_id).cloned()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(task_id).map(|entry| entry.clone())
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.graph.tasks.insert(task.id().to_string(), task);
        self
    }

    /// Add the default edge leaving `from`. A later edge from the same task replaces it.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.edges.insert(from.into(), to.into());
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Status of graph execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// Workflow completed successfully
    Completed,
}
