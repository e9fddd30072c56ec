use weedwise::{provision, ModelLoadError, ModelManager};

#[test]
fn test_missing_model_is_an_error_not_a_panic() {
    let result = provision("/nonexistent/weedwise/crop_weed_classifier.onnx");
    assert!(matches!(result, Err(ModelLoadError::NotFound(_))));
}

#[test]
fn test_corrupt_model_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("corrupt.onnx");
    std::fs::write(&path, b"corrupted data")?;

    let manager = ModelManager::onnx(Default::default());
    assert!(manager.provision(&path).is_err());
    assert!(!manager.is_cached(&path));
    Ok(())
}

#[test]
fn test_default_model_path_file_name() {
    if std::env::var("WEEDWISE_MODEL").is_err() {
        let path = ModelManager::default_model_path();
        assert!(path.ends_with("models/crop_weed_classifier.onnx"));
    }
}
