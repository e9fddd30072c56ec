use std::path::Path;
use std::sync::Arc;

use log::info;

use super::classifier::WeedClassifier;
use super::error::ClassificationError;
use crate::catalog::{default_label_set, validate_label_set};
use crate::model_manager::{ModelHandle, ModelManager};
use crate::runtime::RuntimeConfig;

/// A builder for constructing a WeedClassifier with a fluent interface.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    model: Option<ModelHandle>,
    labels: Option<Vec<String>>,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use weedwise::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ONNX Runtime configuration used by [`with_model_path`](Self::with_model_path).
    ///
    /// # Example
    /// ```
    /// use weedwise::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let config = RuntimeConfig { intra_threads: 2, ..RuntimeConfig::default() };
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(config);
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Uses an already provisioned model handle
    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    /// Loads an ONNX model from `path` through a [`ModelManager`] using the
    /// builder's runtime configuration.
    ///
    /// Each call creates a fresh manager, so the model is loaded again. Use
    /// [`crate::provision`] and [`with_model`](Self::with_model) to share one
    /// cached handle across classifiers.
    ///
    /// # Returns
    /// * `Result<Self, ClassificationError>` - The builder instance if successful, or an error if:
    ///   - A model is already set
    ///   - The model file is missing, corrupt or has an unsupported layout
    pub fn with_model_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ClassificationError> {
        if self.model.is_some() {
            return Err(ClassificationError::Build("Model already set".to_string()));
        }

        let manager = ModelManager::onnx(self.runtime_config.clone());
        let model = manager
            .provision(path.as_ref())
            .map_err(|e| ClassificationError::Build(e.to_string()))?;

        self.model = Some(model);
        Ok(self)
    }

    /// Sets the ordered label set. Index `i` of the model output maps to
    /// `labels[i]`; the order is used as given.
    ///
    /// Defaults to the fifteen species of the bundled catalog.
    pub fn with_labels(mut self, labels: Vec<impl Into<String>>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Builds and returns the final WeedClassifier instance
    ///
    /// # Returns
    /// * `Result<WeedClassifier, ClassificationError>` - The classifier if successful, or an error if:
    ///   - No model has been set
    ///   - The label set is empty or contains duplicates
    ///   - The model declares an output width that differs from the label count
    pub fn build(self) -> Result<WeedClassifier, ClassificationError> {
        let model = self
            .model
            .ok_or_else(|| ClassificationError::Build("No model loaded".to_string()))?;
        let labels = self.labels.unwrap_or_else(default_label_set);

        validate_label_set(&labels)?;

        if let Some(width) = model.output_size() {
            if width != labels.len() {
                return Err(ClassificationError::OutputMismatch {
                    expected: labels.len(),
                    actual: width,
                });
            }
        }

        info!(
            "Built classifier with {} labels, model input size {:?}",
            labels.len(),
            model.input_size()
        );

        Ok(WeedClassifier {
            model,
            labels: Arc::new(labels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LabelSetError;
    use crate::classifier::InferenceModel;
    use ndarray::{Array4, ArrayView4};

    #[derive(Debug)]
    struct Uniform(usize);

    impl InferenceModel for Uniform {
        fn input_size(&self) -> Option<(usize, usize)> {
            Some((120, 120))
        }

        fn output_size(&self) -> Option<usize> {
            Some(self.0)
        }

        fn run(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassificationError> {
            Ok(vec![1.0 / self.0 as f32; self.0])
        }
    }

    #[test]
    fn test_build_requires_model() {
        let result = ClassifierBuilder::new().build();
        assert!(matches!(result, Err(ClassificationError::Build(_))));
    }

    #[test]
    fn test_default_labels() -> Result<(), ClassificationError> {
        let classifier = ClassifierBuilder::new()
            .with_model(Arc::new(Uniform(15)))
            .build()?;
        let info = classifier.info();
        assert_eq!(info.num_classes, 15);
        assert_eq!(info.class_labels[0], "Carpetweeds");
        assert_eq!(info.input_size, Some((120, 120)));

        // Uniform scores tie everywhere, so the first label wins
        let prediction = classifier.classify(Array4::zeros((1, 120, 120, 3)).view())?;
        assert_eq!(prediction.label, "Carpetweeds");
        Ok(())
    }

    #[test]
    fn test_custom_labels_keep_order() -> Result<(), ClassificationError> {
        let classifier = ClassifierBuilder::new()
            .with_model(Arc::new(Uniform(3)))
            .with_labels(vec!["Waterhemp", "Crabgrass", "Eclipta"])
            .build()?;
        assert_eq!(classifier.labels(), &["Waterhemp", "Crabgrass", "Eclipta"]);
        Ok(())
    }

    #[test]
    fn test_output_width_must_match_labels() {
        let result = ClassifierBuilder::new()
            .with_model(Arc::new(Uniform(14)))
            .build();
        assert!(matches!(
            result,
            Err(ClassificationError::OutputMismatch { expected: 15, actual: 14 })
        ));
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let result = ClassifierBuilder::new()
            .with_model(Arc::new(Uniform(2)))
            .with_labels(vec!["Ragweed", "Ragweed"])
            .build();
        assert!(matches!(
            result,
            Err(ClassificationError::LabelSet(LabelSetError::Duplicate(_)))
        ));
    }

    #[test]
    fn test_missing_model_path() {
        let result = ClassifierBuilder::new().with_model_path("/nonexistent/model.onnx");
        assert!(matches!(result, Err(ClassificationError::Build(_))));
    }

    #[test]
    fn test_model_already_set() {
        let result = ClassifierBuilder::new()
            .with_model(Arc::new(Uniform(15)))
            .with_model_path("/nonexistent/model.onnx");
        assert!(matches!(result, Err(ClassificationError::Build(_))));
    }
}
