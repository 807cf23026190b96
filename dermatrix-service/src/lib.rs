pub mod assistant;
pub mod classifier;
pub mod conditions;
pub mod config;
pub mod error;
pub mod imaging;
pub mod models;
pub mod service;
pub mod tasks;
pub mod workflow;

pub use assistant::{Assistant, ScriptedAssistant};
pub use classifier::{ClassificationResult, Classifier, LazyClassifier, OnnxClassifier};
pub use config::{AppConfig, ConfidenceMode, LogFormat};
pub use error::{DetectionError, DetectionResult};
pub use imaging::NormalizedImage;
pub use models::*;
pub use service::{AppState, build_router, create_app};
pub use workflow::{
    build_chat_workflow, build_detection_workflow, create_chat_session, create_detection_session,
    create_flow_runner,
};
