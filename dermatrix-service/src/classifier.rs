//! Classifier adapter around the pre-trained lesion model.
//!
//! The model is an ONNX export of the skin classifier. It takes a batch of
//! `[N, H, W, 3]` f32 tensors holding raw 0-255 channel values and produces one
//! probability per [`Label`], in [`Label::ALL`] order.
//!
//! [`LazyClassifier`] loads the artifact on first use and keeps it for the
//! lifetime of the process. Concurrent first requests block on the same load.

use ndarray::{Array4, Axis};
use once_cell::sync::OnceCell;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::conditions::{LABEL_COUNT, Label};
use crate::error::{DetectionError, DetectionResult};
use crate::imaging::{CHANNELS, NormalizedImage};

/// Maps a normalized image to a probability vector over the 10 labels
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &NormalizedImage) -> DetectionResult<Vec<f32>>;

    /// Whether the model is in memory and `classify` will not trigger a load
    fn is_ready(&self) -> bool {
        true
    }
}

/// Output of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Model probability of `label`
    pub score: f32,
    pub probabilities: Vec<f32>,
}

impl ClassificationResult {
    pub fn from_probabilities(probabilities: Vec<f32>) -> DetectionResult<Self> {
        if probabilities.len() != LABEL_COUNT {
            return Err(DetectionError::Inference(format!(
                "model produced {} scores, expected {}",
                probabilities.len(),
                LABEL_COUNT
            )));
        }
        let index = argmax(&probabilities).ok_or_else(|| {
            DetectionError::Inference("model produced no finite scores".to_string())
        })?;

        Ok(Self {
            label: Label::from_index(index)?,
            score: probabilities[index],
            probabilities,
        })
    }
}

/// Index of the largest value; ties go to the lowest index. NaN entries are skipped.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// ONNX Runtime backed classifier
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_size: u32,
    output_name: String,
}

impl OnnxClassifier {
    pub fn load(model_path: impl AsRef<Path>, input_size: u32) -> DetectionResult<Self> {
        let model_path = model_path.as_ref();
        info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(DetectionError::ModelLoad(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| DetectionError::ModelLoad(format!("session builder error: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DetectionError::ModelLoad(format!("optimization error: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| DetectionError::ModelLoad(format!("failed to load model: {}", e)))?;

        if session.inputs.len() != 1 {
            return Err(DetectionError::ModelLoad(format!(
                "expected a single image input, model declares {}",
                session.inputs.len()
            )));
        }
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| DetectionError::ModelLoad("model declares no outputs".to_string()))?;

        info!("ONNX model loaded, output '{}'", output_name);

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            output_name,
        })
    }

    /// Add the batch axis and widen to f32: `[H, W, 3]` u8 → `[1, H, W, 3]` f32
    fn to_batch(&self, image: &NormalizedImage) -> DetectionResult<Array4<f32>> {
        check_input_shape(image, self.input_size)?;
        let view = image
            .view()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        Ok(view.mapv(f32::from).insert_axis(Axis(0)))
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &NormalizedImage) -> DetectionResult<Vec<f32>> {
        let start = Instant::now();
        let batch = self.to_batch(image)?;

        let input = Value::from_array(batch)
            .map_err(|e| DetectionError::Inference(format!("tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectionError::Inference(format!("run failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| DetectionError::Inference("model returned no output".to_string()))?;
        let (_, scores) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(format!("extract error: {}", e)))?;

        debug!(
            "Inference took {} us for {} scores",
            start.elapsed().as_micros(),
            scores.len()
        );
        Ok(scores.to_vec())
    }
}

/// The image must be `size × size × 3`
pub fn check_input_shape(image: &NormalizedImage, size: u32) -> DetectionResult<()> {
    let expected = (size as usize, size as usize, CHANNELS);
    if image.shape() != expected {
        return Err(DetectionError::Inference(format!(
            "input shape {:?} does not match model input {:?}",
            image.shape(),
            expected
        )));
    }
    Ok(())
}

type Loader<C> = Box<dyn Fn() -> DetectionResult<C> + Send + Sync>;

/// Loads a classifier once, on first use, and reuses it afterwards.
/// A failed load is not cached; the next call tries again.
pub struct LazyClassifier<C = OnnxClassifier> {
    source: String,
    loader: Loader<C>,
    cell: OnceCell<C>,
}

impl LazyClassifier<OnnxClassifier> {
    pub fn new(model_path: impl Into<PathBuf>, input_size: u32) -> Self {
        let model_path: PathBuf = model_path.into();
        Self::with_loader(model_path.display().to_string(), move || {
            OnnxClassifier::load(&model_path, input_size)
        })
    }
}

impl<C> LazyClassifier<C> {
    /// `source` names what `loader` loads, for logs
    pub fn with_loader<F>(source: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> DetectionResult<C> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> DetectionResult<&C> {
        self.cell.get_or_try_init(|| {
            (self.loader)().inspect_err(|e| {
                warn!("Model load failed, will retry on next request: {}", e);
            })
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<C: Classifier> Classifier for LazyClassifier<C> {
    fn classify(&self, image: &NormalizedImage) -> DetectionResult<Vec<f32>> {
        self.get()?.classify(image)
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }
}
