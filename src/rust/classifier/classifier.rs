use std::sync::Arc;

use log::{debug, warn};
use ndarray::{ArrayView4, CowArray};
use serde::Serialize;

use super::error::ClassificationError;
use super::model::InferenceModel;
use super::utils::{argmax, resize_bilinear};
use crate::model_manager::ModelHandle;

/// The top class of one classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Largest score of the output distribution, in `[0, 1]` for a softmax model
    pub confidence: f32,
}

/// A classifier bound to a loaded model and its ordered label set.
///
/// # Thread Safety
///
/// The model is shared through `Arc` and the label set is immutable, so a
/// `WeedClassifier` can be shared across threads with `Arc` as well.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use weedwise::{WeedClassifier, preprocess_path, DEFAULT_TARGET_SIZE};
///
/// let classifier = WeedClassifier::builder()
///     .with_model_path("crop_weed_classifier.onnx")?
///     .build()?;
///
/// let tensor = preprocess_path("field.jpg", DEFAULT_TARGET_SIZE)?;
/// let prediction = classifier.classify(tensor.view())?;
/// println!("{} ({:.1}%)", prediction.label, prediction.confidence * 100.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WeedClassifier {
    pub(crate) model: ModelHandle,
    pub(crate) labels: Arc<Vec<String>>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<WeedClassifier>();
    }
};

impl WeedClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            num_classes: self.labels.len(),
            class_labels: self.labels.as_ref().clone(),
            input_size: self.model.input_size(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Classifies a preprocessed `[1, H, W, 3]` tensor.
    pub fn classify(&self, tensor: ArrayView4<'_, f32>) -> Result<Prediction, ClassificationError> {
        classify(Some(self.model.as_ref()), tensor, &self.labels)
    }
}

/// Runs one prediction of `model` on `tensor` and maps the top score onto
/// `labels`.
///
/// The tensor is resized to the model's declared input size when they
/// differ. `None` for the model is reported as
/// [`ClassificationError::ModelUnavailable`], so callers holding a failed
/// provisioning result get an error rather than a stale prediction.
pub fn classify(
    model: Option<&dyn InferenceModel>,
    tensor: ArrayView4<'_, f32>,
    labels: &[String],
) -> Result<Prediction, ClassificationError> {
    let model = model.ok_or(ClassificationError::ModelUnavailable)?;

    let (batch, height, width, channels) = tensor.dim();
    if batch != 1 || channels != 3 || height == 0 || width == 0 {
        return Err(ClassificationError::InvalidInputShape(tensor.shape().to_vec()));
    }

    let input: CowArray<'_, f32, _> = match model.input_size() {
        Some((model_h, model_w)) if (model_h, model_w) != (height, width) => {
            debug!(
                "Resizing input tensor from {}x{} to model size {}x{}",
                height, width, model_h, model_w
            );
            resize_bilinear(tensor, model_h, model_w).into()
        }
        _ => tensor.into(),
    };

    let scores = model.run(input.view())?;

    if scores.len() != labels.len() {
        warn!(
            "Model output width {} does not match label set of {}",
            scores.len(),
            labels.len()
        );
        return Err(ClassificationError::OutputMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    }
    if scores.is_empty() {
        return Err(ClassificationError::EmptyOutput);
    }

    let (index, confidence) = argmax(&scores).ok_or_else(|| {
        ClassificationError::Inference("Model produced no comparable scores".to_string())
    })?;

    debug!("Top class {} '{}' with score {:.4}", index, labels[index], confidence);
    Ok(Prediction {
        label: labels[index].clone(),
        confidence,
    })
}
