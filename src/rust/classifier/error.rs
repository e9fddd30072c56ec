use ort::Error as OrtError;

use crate::catalog::LabelSetError;

/// Errors raised while building a classifier or running a prediction.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// No model handle was available for the prediction
    #[error("Model is not loaded")]
    ModelUnavailable,
    /// The model failed while running inference
    #[error("Inference error: {0}")]
    Inference(String),
    /// The input tensor does not have the `[1, H, W, 3]` layout
    #[error("Invalid input tensor shape {0:?}, expected [1, H, W, 3]")]
    InvalidInputShape(Vec<usize>),
    /// The model output cannot be mapped onto the label set
    #[error("Model produced {actual} scores but the label set has {expected} labels")]
    OutputMismatch { expected: usize, actual: usize },
    /// The model produced no scores at all
    #[error("Model produced an empty output")]
    EmptyOutput,
    /// The label set is unusable
    #[error("Invalid label set: {0}")]
    LabelSet(#[from] LabelSetError),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    Build(String),
}

impl From<OrtError> for ClassificationError {
    fn from(err: OrtError) -> Self {
        ClassificationError::Inference(err.to_string())
    }
}
