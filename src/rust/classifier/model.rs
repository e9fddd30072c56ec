use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};
use ndarray::ArrayView4;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::ClassificationError;
use crate::model_manager::ModelLoadError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A loaded image classification model.
///
/// Implementations take a single NHWC `[1, H, W, 3]` tensor and return one
/// score per label. They must be safe to share between threads.
pub trait InferenceModel: Send + Sync + fmt::Debug {
    /// Spatial input size `(height, width)` declared by the model, or `None`
    /// when the model accepts any size.
    fn input_size(&self) -> Option<(usize, usize)>;

    /// Number of scores the model produces, when it is known ahead of time.
    fn output_size(&self) -> Option<usize> {
        None
    }

    /// Runs one forward pass.
    fn run(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassificationError>;
}

/// An ONNX classifier executed with ONNX Runtime.
///
/// The graph must take one float tensor of shape `[N, H, W, 3]` and produce
/// scores as its first output.
pub struct OnnxModel {
    path: PathBuf,
    session: Mutex<Session>,
    input_name: String,
    input_size: Option<(usize, usize)>,
    output_size: Option<usize>,
}

impl fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxModel")
            .field("path", &self.path)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("output_size", &self.output_size)
            .finish()
    }
}

impl OnnxModel {
    /// Loads and validates an ONNX model from disk.
    pub fn load<P: AsRef<Path>>(path: P, config: &RuntimeConfig) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        info!("Loading ONNX model from {:?}", path);
        let session = create_session_builder(config)?
            .commit_from_file(path)
            .map_err(|e| ModelLoadError::Runtime(e.to_string()))?;

        let (input_name, input_size) = Self::validate_input(&session)?;
        let output_size = Self::validate_output(&session)?;

        info!(
            "Model ready: input '{}' size {:?}, {:?} outputs",
            input_name, input_size, output_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            session: Mutex::new(session),
            input_name,
            input_size,
            output_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks the model has a rank-4 NHWC RGB input and returns its name and
    /// fixed spatial size, if any.
    fn validate_input(
        session: &Session,
    ) -> Result<(String, Option<(usize, usize)>), ModelLoadError> {
        let input = session.inputs().first().ok_or_else(|| {
            ModelLoadError::Incompatible("Model must have one image input, found none".to_string())
        })?;

        let dimensions = match input.dtype() {
            ValueType::Tensor { shape: dimensions, .. } => dimensions,
            other => {
                return Err(ModelLoadError::Incompatible(format!(
                    "Input '{}' must be a tensor, found {:?}",
                    input.name(), other
                )))
            }
        };

        if dimensions.len() != 4 {
            return Err(ModelLoadError::Incompatible(format!(
                "Input '{}' must have rank 4 [N, H, W, 3], found {:?}",
                input.name(), dimensions
            )));
        }
        if dimensions[3] > 0 && dimensions[3] != 3 {
            return Err(ModelLoadError::Incompatible(format!(
                "Input '{}' must have 3 channels last, found {:?}",
                input.name(), dimensions
            )));
        }

        let size = match (dimensions[1], dimensions[2]) {
            (h, w) if h > 0 && w > 0 => Some((h as usize, w as usize)),
            _ => None,
        };
        debug!("Model input '{}' dimensions {:?}", input.name(), dimensions);
        Ok((input.name().to_string(), size))
    }

    fn validate_output(session: &Session) -> Result<Option<usize>, ModelLoadError> {
        let output = session.outputs().first().ok_or_else(|| {
            ModelLoadError::Incompatible(
                "Model must have at least 1 output for class scores".to_string(),
            )
        })?;

        match output.dtype() {
            ValueType::Tensor { shape: dimensions, .. } => Ok(dimensions
                .last()
                .filter(|&&d| d > 0)
                .map(|&d| d as usize)),
            other => Err(ModelLoadError::Incompatible(format!(
                "Output '{}' must be a tensor, found {:?}",
                output.name(), other
            ))),
        }
    }
}

impl InferenceModel for OnnxModel {
    fn input_size(&self) -> Option<(usize, usize)> {
        self.input_size
    }

    fn output_size(&self) -> Option<usize> {
        self.output_size
    }

    fn run(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassificationError> {
        let input = input.as_standard_layout().into_owned();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(input).map_err(|e| {
                ClassificationError::Inference(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        let outputs = session
            .run(input_tensors)
            .map_err(|e| ClassificationError::Inference(format!("Failed to run model: {}", e)))?;
        let (_, output_tensor) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassificationError::Inference(format!("Failed to extract output tensor: {}", e))
            })?;

        Ok(output_tensor.iter().copied().collect())
    }
}
