use dermatrix_flow::ChatMessage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classifier::ClassificationResult;
use crate::conditions::{
    self, CONTAGIOUS_NOTICE, ConditionRecord, DETECTION_DISCLAIMER, NOT_CONTAGIOUS_NOTICE,
};
use crate::config::ConfidenceMode;

/// What the detection view renders for one upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub session_id: String,
    pub condition: String,
    pub slug: String,
    /// Percentage shown to the user
    pub confidence: f64,
    pub confidence_source: String,
    /// Probability the model assigned to `condition`
    pub model_score: f32,
    pub contagious: bool,
    pub contagious_notice: String,
    pub description: String,
    pub primary_treatment: String,
    pub secondary_treatment: String,
    pub disclaimer: String,
}

impl DetectionReport {
    pub fn new(
        session_id: impl Into<String>,
        result: &ClassificationResult,
        mode: ConfidenceMode,
    ) -> Self {
        let record = conditions::record(result.label);
        Self {
            session_id: session_id.into(),
            condition: result.label.name().to_string(),
            slug: result.label.slug().to_string(),
            confidence: displayed_confidence(result.score, mode),
            confidence_source: mode.as_str().to_string(),
            model_score: result.score,
            contagious: record.contagious,
            contagious_notice: contagious_notice(record.contagious).to_string(),
            description: record.description.to_string(),
            primary_treatment: record.primary_treatment.to_string(),
            secondary_treatment: record.secondary_treatment.to_string(),
            disclaimer: DETECTION_DISCLAIMER.to_string(),
        }
    }
}

pub fn contagious_notice(contagious: bool) -> &'static str {
    if contagious {
        CONTAGIOUS_NOTICE
    } else {
        NOT_CONTAGIOUS_NOTICE
    }
}

/// Confidence percentage, rounded to two decimals
pub fn displayed_confidence(score: f32, mode: ConfidenceMode) -> f64 {
    let percent = match mode {
        ConfidenceMode::Model => f64::from(score.clamp(0.0, 1.0)) * 100.0,
        ConfidenceMode::Synthetic => {
            let mut rng = rand::rng();
            f64::from(rng.random_range(88u32..=99)) + f64::from(rng.random_range(0u32..=99)) * 0.01
        }
    };
    (percent * 100.0).round() / 100.0
}

/// A condition as listed in the About view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionView {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub primary_treatment: String,
    pub secondary_treatment: String,
    pub contagious: bool,
}

impl From<&ConditionRecord> for ConditionView {
    fn from(record: &ConditionRecord) -> Self {
        Self {
            name: record.label.name().to_string(),
            slug: record.label.slug().to_string(),
            description: record.description.to_string(),
            primary_treatment: record.primary_treatment.to_string(),
            secondary_treatment: record.secondary_treatment.to_string(),
            contagious: record.contagious,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AboutResponse {
    pub about: String,
    pub conditions: Vec<ConditionView>,
    pub disclaimer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSessionResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub disclaimer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReplyResponse {
    pub session_id: String,
    pub reply: String,
    pub message_count: usize,
}
