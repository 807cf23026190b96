use base64::{Engine as _, engine::general_purpose::STANDARD};
use dermatrix_flow::{
    FlowRunner, Graph, GraphBuilder, GraphStorage, InMemoryGraphStorage, Result, Session,
    SessionStorage, Task,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::assistant::Assistant;
use crate::classifier::Classifier;
use crate::config::ConfidenceMode;
use crate::tasks::*;

pub const DETECTION_GRAPH: &str = "detection";
pub const CHAT_GRAPH: &str = "chat";

pub fn build_detection_workflow(
    classifier: Arc<dyn Classifier>,
    input_size: u32,
    confidence: ConfidenceMode,
) -> Graph {
    let normalize_task = Arc::new(NormalizeImageTask::new(input_size));
    let normalize_id = normalize_task.id().to_string();

    let classify_task = Arc::new(ClassifyLesionTask::new(classifier));
    let classify_id = classify_task.id().to_string();

    let lookup_task = Arc::new(LookupConditionTask::new(confidence));
    let lookup_id = lookup_task.id().to_string();

    GraphBuilder::new(DETECTION_GRAPH)
        .add_task(normalize_task)
        .add_task(classify_task)
        .add_task(lookup_task)
        .add_edge(&normalize_id, &classify_id)
        .add_edge(&classify_id, &lookup_id)
        .build()
}

pub fn build_chat_workflow(assistant: Arc<dyn Assistant>) -> Graph {
    GraphBuilder::new(CHAT_GRAPH)
        .add_task(Arc::new(ChatReplyTask::new(assistant)))
        .build()
}

/// New detection session holding `upload`, positioned on the normalize step
pub async fn create_detection_session(upload: &[u8]) -> Result<Session> {
    let session_id = Uuid::new_v4().to_string();
    let session = Session::new(
        session_id.clone(),
        DETECTION_GRAPH,
        std::any::type_name::<NormalizeImageTask>(),
    );
    session
        .context
        .set(session_keys::SESSION_ID, &session_id)
        .await?;
    session
        .context
        .set(session_keys::UPLOAD, STANDARD.encode(upload))
        .await?;
    Ok(session)
}

/// New chat session whose log starts with the assistant's greeting
pub async fn create_chat_session(assistant: &dyn Assistant) -> Session {
    let session = Session::new(
        Uuid::new_v4().to_string(),
        CHAT_GRAPH,
        std::any::type_name::<ChatReplyTask>(),
    );
    session
        .context
        .add_assistant_message(assistant.greeting())
        .await;
    session
}

/// Register both workflows and return a runner over `session_storage`
pub async fn create_flow_runner(
    classifier: Arc<dyn Classifier>,
    assistant: Arc<dyn Assistant>,
    input_size: u32,
    confidence: ConfidenceMode,
    session_storage: Arc<dyn SessionStorage>,
) -> Result<FlowRunner> {
    let graphs = Arc::new(InMemoryGraphStorage::new());
    graphs
        .save(
            DETECTION_GRAPH.to_string(),
            Arc::new(build_detection_workflow(classifier, input_size, confidence)),
        )
        .await?;
    graphs
        .save(
            CHAT_GRAPH.to_string(),
            Arc::new(build_chat_workflow(assistant)),
        )
        .await?;

    Ok(FlowRunner::new(graphs, session_storage))
}
