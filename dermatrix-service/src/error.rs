use dermatrix_flow::GraphError;
use thiserror::Error;

/// Failures of the normalize → classify → lookup pipeline
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unknown condition label: {0}")]
    UnknownLabel(String),
}

impl From<DetectionError> for GraphError {
    fn from(err: DetectionError) -> Self {
        GraphError::Task(anyhow::Error::new(err))
    }
}

impl From<image::ImageError> for DetectionError {
    fn from(err: image::ImageError) -> Self {
        DetectionError::InvalidImage(err.to_string())
    }
}

pub type DetectionResult<T> = std::result::Result<T, DetectionError>;

impl DetectionError {
    /// Stable identifier used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::InvalidImage(_) => "invalid_image",
            DetectionError::ModelLoad(_) => "model_load",
            DetectionError::Inference(_) => "inference",
            DetectionError::UnknownLabel(_) => "unknown_label",
        }
    }
}
