//! Weed identification from field photographs and context-aware herbicide
//! recommendations.
//!
//! The crate turns an image into a `[1, 120, 120, 3]` tensor, classifies it
//! with an ONNX model into one of fifteen weed species, and combines the
//! result with soil, temperature and crop information into treatment advice.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use weedwise::{Pipeline, PipelineConfig, EnvironmentContext, SoilType};
//!
//! let pipeline = Pipeline::new(PipelineConfig {
//!     model_path: "crop_weed_classifier.onnx".into(),
//!     ..PipelineConfig::default()
//! })?;
//!
//! let bytes = std::fs::read("field.jpg")?;
//! let context = EnvironmentContext::new(SoilType::Sandy, 25.0, "Wheat");
//! let report = pipeline.analyze(&bytes, None, &context)?;
//!
//! println!("Treat {} with {:?}", report.label, report.recommendation.pesticides);
//! for note in &report.recommendation.contextual_notes {
//!     println!("- {}", note);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Recommendations need no model at all:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rec = weedwise::recommend("Crabgrass", "Sandy", 25.0, "Wheat")?;
//! assert_eq!(rec.pesticides[0], "Quinclorac");
//! assert_eq!(rec.contextual_notes.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The catalog is immutable after first use and the model cache loads each
//! path once, even when several threads ask for it at the same time.
//! Classifiers and pipelines are `Send + Sync` and can be shared with `Arc`.

pub mod catalog;
pub mod classifier;
pub mod model_manager;
pub mod pipeline;
pub mod preprocess;
pub mod recommend;
mod runtime;

pub use catalog::{lookup, validate_label_set, LabelSetError, WeedLabel, WeedRecord};
pub use classifier::{
    classify, ClassificationError, ClassifierBuilder, ClassifierInfo, InferenceModel, OnnxModel,
    Prediction, WeedClassifier,
};
pub use model_manager::{provision, ModelHandle, ModelLoadError, ModelManager};
pub use pipeline::{advise, weed_override, Diagnosis, Pipeline, PipelineConfig, Report, WeedError};
pub use preprocess::{
    preprocess, preprocess_bytes, preprocess_path, PreprocessError, DEFAULT_TARGET_SIZE,
};
pub use recommend::{
    recommend, recommend_for, Crop, EnvironmentContext, Recommendation, RecommendationError,
    SoilType, TemperatureBand,
};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
