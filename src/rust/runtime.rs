use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::sync::OnceLock;

use crate::model_manager::ModelLoadError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// ONNX Runtime settings applied to every session the crate creates.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
        _ => *level,
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("weedwise")
        .commit();
    Ok(())
}

/// Initializes the ONNX Runtime environment once per process. Later calls
/// return the outcome of the first one.
pub fn ensure_initialized() -> Result<(), String> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
}

fn init_failed(reason: String) -> ModelLoadError {
    log::error!("ONNX Runtime environment initialization failed: {}", reason);
    ModelLoadError::Runtime(format!("ONNX Runtime environment initialization failed: {}", reason))
}

fn configure(config: &RuntimeConfig) -> OrtResult<SessionBuilder> {
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

/// Creates a session builder, initializing the environment first if needed.
pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ModelLoadError> {
    ensure_initialized().map_err(init_failed)?;
    configure(config).map_err(|e| ModelLoadError::Runtime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_initialization() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok()); // Second call should be fine
    }

    #[test]
    fn test_session_builder_config() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 2,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        let builder = create_session_builder(&config);
        assert!(builder.is_ok());
    }

    #[test]
    fn test_init_failure_is_a_load_error() {
        let err = init_failed("library not found".to_string());
        match err {
            ModelLoadError::Runtime(message) => assert!(message.contains("library not found")),
            other => panic!("Expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_clone() {
        let config = RuntimeConfig {
            inter_threads: 1,
            intra_threads: 3,
            optimization_level: GraphOptimizationLevel::Disable,
        };
        let copy = config.clone();
        assert_eq!(copy.intra_threads, 3);
        assert!(matches!(copy.optimization_level, GraphOptimizationLevel::Disable));
    }
}
