use async_trait::async_trait;
use dermatrix_flow::ChatMessage;

pub const GREETING: &str = "Hello! I'm your Skin Health Assistant. How can I help you with your skin health questions today?";

pub const CANNED_REPLY: &str = "I'm a simple demo chatbot. In the full version, I would analyze your question and provide information about skin conditions, treatments, and preventive measures. For now, please try the Detection tab to analyze skin images or check the About tab for information on common skin conditions.";

pub const CHAT_DISCLAIMER: &str = "This chatbot provides general information only. For specific medical advice, please consult a healthcare professional.";

/// Produces the assistant's side of a chat
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Message that opens every new conversation
    fn greeting(&self) -> &str;

    /// Reply to `prompt`; `history` holds the conversation before it
    async fn reply(&self, history: &[ChatMessage], prompt: &str) -> anyhow::Result<String>;
}

/// Placeholder assistant: answers every prompt with the same text
pub struct ScriptedAssistant {
    greeting: String,
    reply: String,
}

impl ScriptedAssistant {
    pub fn new(greeting: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            reply: reply.into(),
        }
    }
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new(GREETING, CANNED_REPLY)
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    fn greeting(&self) -> &str {
        &self.greeting
    }

    async fn reply(&self, _history: &[ChatMessage], _prompt: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}
