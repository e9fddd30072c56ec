use std::path::PathBuf;

use image::DynamicImage;
use log::info;
use serde::Serialize;

use crate::catalog::{self, WeedRecord};
use crate::classifier::{ClassificationError, Prediction, WeedClassifier};
use crate::model_manager::{self, ModelLoadError, ModelManager};
use crate::preprocess::{self, PreprocessError, DEFAULT_TARGET_SIZE};
use crate::recommend::{self, EnvironmentContext, Recommendation, RecommendationError};

/// Any failure of the identification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum WeedError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model_path: PathBuf,
    /// Expected SHA-256 of the model file, checked before it is first loaded
    pub model_sha256: Option<String>,
    /// `(width, height)` images are resized to before classification
    pub target_size: (u32, u32),
    /// Label set in model output order; `None` uses the catalog order
    pub labels: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: ModelManager::default_model_path(),
            model_sha256: None,
            target_size: DEFAULT_TARGET_SIZE,
            labels: None,
        }
    }
}

/// A prediction together with the catalog record for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub prediction: Prediction,
    pub record: WeedRecord,
}

impl Diagnosis {
    pub fn from_prediction(prediction: Prediction) -> Self {
        let record = catalog::lookup(&prediction.label);
        Self { prediction, record }
    }
}

/// Outcome of a full run: what was seen and what to do about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// `None` when the caller supplied the label directly
    pub diagnosis: Option<Diagnosis>,
    /// Label the recommendation was built for
    pub label: String,
    pub recommendation: Recommendation,
}

/// Image → prediction → recommendation, bound to one classifier.
#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: WeedClassifier,
    target_size: (u32, u32),
}

impl Pipeline {
    /// Provisions the model through the process-wide manager and builds the
    /// classifier.
    pub fn new(config: PipelineConfig) -> Result<Self, WeedError> {
        Self::with_manager(model_manager::global(), config)
    }

    pub fn with_manager(manager: &ModelManager, config: PipelineConfig) -> Result<Self, WeedError> {
        let model = match &config.model_sha256 {
            Some(hash) => manager.provision_verified(&config.model_path, hash)?,
            None => manager.provision(&config.model_path)?,
        };

        let mut builder = WeedClassifier::builder().with_model(model);
        if let Some(labels) = config.labels {
            builder = builder.with_labels(labels);
        }
        let classifier = builder.build()?;

        info!("Pipeline ready with model {:?}", config.model_path);
        Ok(Self::from_classifier(classifier, config.target_size))
    }

    pub fn from_classifier(classifier: WeedClassifier, target_size: (u32, u32)) -> Self {
        Self { classifier, target_size }
    }

    pub fn classifier(&self) -> &WeedClassifier {
        &self.classifier
    }

    pub fn identify(&self, image: &DynamicImage) -> Result<Diagnosis, WeedError> {
        let tensor = preprocess::preprocess(image, self.target_size)?;
        let prediction = self.classifier.classify(tensor.view())?;
        info!(
            "Identified '{}' with {:.1}% confidence",
            prediction.label,
            prediction.confidence * 100.0
        );
        Ok(Diagnosis::from_prediction(prediction))
    }

    pub fn identify_bytes(&self, bytes: &[u8]) -> Result<Diagnosis, WeedError> {
        let image = image::load_from_memory(bytes).map_err(PreprocessError::from)?;
        self.identify(&image)
    }

    /// Identifies the weed in `bytes` and recommends treatment for it.
    ///
    /// A non-empty `label_override` replaces the predicted label for the
    /// recommendation; the diagnosis still reports what the model saw.
    pub fn analyze(
        &self,
        bytes: &[u8],
        label_override: Option<&str>,
        context: &EnvironmentContext,
    ) -> Result<Report, WeedError> {
        let diagnosis = self.identify_bytes(bytes)?;
        let label = match weed_override(label_override) {
            Some(label) => label.to_string(),
            None => diagnosis.prediction.label.clone(),
        };
        let recommendation = recommend::recommend_for(&label, context)?;
        Ok(Report {
            diagnosis: Some(diagnosis),
            label,
            recommendation,
        })
    }
}

/// Trims a user-supplied weed label; blank input counts as no label.
pub fn weed_override(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|label| !label.is_empty())
}

/// Builds a report for a label chosen by the caller, without an image.
pub fn advise(label: &str, context: &EnvironmentContext) -> Result<Report, WeedError> {
    let recommendation = recommend::recommend_for(label, context)?;
    Ok(Report {
        diagnosis: None,
        label: label.to_string(),
        recommendation,
    })
}
