mod error;
mod model;
#[allow(clippy::module_inception)]
mod classifier;
pub mod builder;
mod utils;

pub use error::ClassificationError;
pub use model::{InferenceModel, OnnxModel};
pub use classifier::{classify, Prediction, WeedClassifier};
pub use builder::ClassifierBuilder;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Number of classes the model scores
    pub num_classes: usize,
    /// Labels of the classes, in model output order
    pub class_labels: Vec<String>,
    /// Spatial input size `(height, width)` declared by the model
    pub input_size: Option<(usize, usize)>,
}
