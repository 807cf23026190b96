use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    chat::{ChatHistory, ChatMessage},
    error::{GraphError, Result},
};

/// Per-session state shared by the tasks of a graph.
///
/// Clones share the same underlying storage, so a task can update the context
/// it was handed and the session sees the change.
#[derive(Clone, Debug)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
    chat_history: Arc<RwLock<ChatHistory>>,
    turn: Arc<Mutex<()>>,
}

/// Copy of a context's values and chat log at one point in time
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    data: Vec<(String, Value)>,
    chat_history: ChatHistory,
}

impl Context {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            chat_history: Arc::new(RwLock::new(ChatHistory::new())),
            turn: Arc::new(Mutex::new(())),
        }
    }

    /// Exclusive turn on this session. Every clone of the context shares the same lock,
    /// so callers that hold the guard across write → run → read see no interleaving.
    pub async fn lock_turn(&self) -> OwnedMutexGuard<()> {
        self.turn.clone().lock_owned().await
    }

    pub async fn snapshot(&self) -> ContextSnapshot {
        let chat_history = self.chat_history.read().await.clone();
        let data = self
            .data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        ContextSnapshot { data, chat_history }
    }

    /// Replace every value and the chat log with those of `snapshot`
    pub async fn restore(&self, snapshot: ContextSnapshot) {
        let mut chat_history = self.chat_history.write().await;
        self.data.clear();
        for (key, value) in snapshot.data {
            self.data.insert(key, value);
        }
        *chat_history = snapshot.chat_history;
    }

    pub async fn set(&self, key: impl Into<String>, value: impl serde::Serialize) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| GraphError::ContextError(format!("Failed to serialize '{}': {}", key, e)))?;
        self.data.insert(key, value);
        Ok(())
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Like [`Context::get`] but a missing or mistyped value is a `ContextError`.
    pub async fn require<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)
            .await
            .ok_or_else(|| GraphError::ContextError(format!("{} not found in context", key)))
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn add_user_message(&self, content: impl Into<String>) {
        self.chat_history
            .write()
            .await
            .push(ChatMessage::user(content));
    }

    pub async fn add_assistant_message(&self, content: impl Into<String>) {
        self.chat_history
            .write()
            .await
            .push(ChatMessage::assistant(content));
    }

    pub async fn get_all_messages(&self) -> Vec<ChatMessage> {
        self.chat_history.read().await.messages().to_vec()
    }

    pub async fn chat_len(&self) -> usize {
        self.chat_history.read().await.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
