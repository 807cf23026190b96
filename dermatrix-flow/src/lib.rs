pub mod chat;
pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod task;

// Re-export commonly used types
pub use chat::{ChatHistory, ChatMessage, MessageRole};
pub use context::{Context, ContextSnapshot};
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{
    GraphStorage, InMemoryGraphStorage, InMemorySessionStorage, Session, SessionStorage,
};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AppendTask {
        id: String,
        next_action: NextAction,
    }

    impl AppendTask {
        fn new(id: &str, next_action: NextAction) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                next_action,
            })
        }
    }

    #[async_trait]
    impl Task for AppendTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let mut trail: Vec<String> = context.get("trail").await.unwrap_or_default();
            trail.push(self.id.clone());
            context.set("trail", &trail).await?;

            Ok(TaskResult::new_with_status(
                Some(trail.join(",")),
                self.next_action.clone(),
                Some(format!("{} done", self.id)),
            ))
        }
    }

    struct FailingTask;

    #[async_trait]
    impl Task for FailingTask {
        async fn run(&self, _context: Context) -> Result<TaskResult> {
            Err(GraphError::TaskExecutionFailed("boom".to_string()))
        }
    }

    /// Writes a value and a chat message, then fails
    struct WriteThenFail;

    #[async_trait]
    impl Task for WriteThenFail {
        async fn run(&self, context: Context) -> Result<TaskResult> {
            context.set("half_done", true).await?;
            context.add_user_message("partial").await;
            Err(GraphError::TaskExecutionFailed("failed after writing".to_string()))
        }
    }

    fn chained_graph() -> Graph {
        GraphBuilder::new("chain")
            .add_task(AppendTask::new("decode", NextAction::ContinueAndExecute))
            .add_task(AppendTask::new("score", NextAction::ContinueAndExecute))
            .add_task(AppendTask::new("report", NextAction::End))
            .add_edge("decode", "score")
            .add_edge("score", "report")
            .build()
    }

    #[tokio::test]
    async fn test_continue_and_execute_runs_whole_chain() {
        let graph = chained_graph();

        let mut session = Session::new("s1", "chain", "decode");
        let result = graph.execute_session(&mut session).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.response.as_deref(), Some("decode,score,report"));
        assert_eq!(session.current_task_id, "report");
        assert_eq!(session.status_message.as_deref(), Some("report done"));
    }

    #[tokio::test]
    async fn test_continue_yields_after_one_step() {
        let graph = GraphBuilder::new("steps")
            .add_task(AppendTask::new("first", NextAction::Continue))
            .add_task(AppendTask::new("second", NextAction::End))
            .add_edge("first", "second")
            .build();

        let mut session = Session::new("s1", "steps", "first");
        let result = graph.execute_session(&mut session).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(session.current_task_id, "second");
    }

    #[tokio::test]
    async fn test_wait_for_input_stays_on_task() {
        let graph = GraphBuilder::new("chat")
            .add_task(AppendTask::new("reply", NextAction::WaitForInput))
            .build();

        let mut session = Session::new("s1", "chat", "reply");
        graph.execute_session(&mut session).await.unwrap();
        let result = graph.execute_session(&mut session).await.unwrap();

        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(result.response.as_deref(), Some("reply,reply"));
        assert_eq!(session.current_task_id, "reply");
    }

    #[tokio::test]
    async fn test_failure_stops_chain() {
        let failing = Arc::new(FailingTask);
        let failing_id = failing.id().to_string();
        let graph = GraphBuilder::new("broken")
            .add_task(failing)
            .add_task(AppendTask::new("after", NextAction::End))
            .add_edge(&failing_id, "after")
            .build();

        let mut session = Session::new("s1", "broken", &failing_id);
        let err = graph.execute_session(&mut session).await.unwrap_err();

        assert!(matches!(err, GraphError::TaskExecutionFailed(_)));
        assert!(session.context.get::<Vec<String>>("trail").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let graph = chained_graph();
        let mut session = Session::new("s1", "chain", "missing");
        let err = graph.execute_session(&mut session).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_runner_resolves_graph_and_persists() {
        let graphs = Arc::new(InMemoryGraphStorage::new());
        let sessions = Arc::new(InMemorySessionStorage::new());
        graphs
            .save("chain".to_string(), Arc::new(chained_graph()))
            .await
            .unwrap();

        let runner = FlowRunner::new(graphs, sessions.clone());

        sessions
            .save(Session::new("s1", "chain", "decode"))
            .await
            .unwrap();
        let result = runner.run("s1").await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);

        let stored = sessions.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.current_task_id, "report");
        let trail: Vec<String> = stored.context.require("trail").await.unwrap();
        assert_eq!(trail.len(), 3);

        sessions
            .save(Session::new("s2", "unknown", "decode"))
            .await
            .unwrap();
        assert!(matches!(
            runner.run("s2").await,
            Err(GraphError::GraphNotFound(_))
        ));
        assert!(matches!(
            runner.run("nope").await,
            Err(GraphError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_run_leaves_stored_session_untouched() {
        let graphs = Arc::new(InMemoryGraphStorage::new());
        let sessions = Arc::new(InMemorySessionStorage::new());
        let task = Arc::new(WriteThenFail);
        let task_id = task.id().to_string();
        graphs
            .save(
                "fragile".to_string(),
                Arc::new(GraphBuilder::new("fragile").add_task(task).build()),
            )
            .await
            .unwrap();
        let runner = FlowRunner::new(graphs, sessions.clone());

        let session = Session::new("s1", "fragile", &task_id);
        session.context.set("upload", "abc").await.unwrap();
        session.context.add_assistant_message("Hello!").await;
        sessions.save(session).await.unwrap();

        assert!(runner.run("s1").await.is_err());

        let stored = sessions.get("s1").await.unwrap().unwrap();
        assert!(stored.context.get::<bool>("half_done").await.is_none());
        assert_eq!(stored.context.get::<String>("upload").await.as_deref(), Some("abc"));
        assert_eq!(stored.context.chat_len().await, 1);
        assert_eq!(stored.current_task_id, task_id);
    }

    #[tokio::test]
    async fn test_session_storage_delete() {
        let sessions = InMemorySessionStorage::new();
        sessions.save(Session::new("s1", "chat", "reply")).await.unwrap();

        assert_eq!(sessions.len(), 1);
        assert!(sessions.delete("s1").await.unwrap());
        assert!(!sessions.delete("s1").await.unwrap());
        assert!(sessions.get("s1").await.unwrap().is_none());
    }
}
