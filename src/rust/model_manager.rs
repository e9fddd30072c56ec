use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

use crate::classifier::{InferenceModel, OnnxModel};
use crate::runtime::RuntimeConfig;

/// File name of the bundled weed classifier inside the models directory.
pub const DEFAULT_MODEL_FILE: &str = "crop_weed_classifier.onnx";

/// A loaded model, shared by every caller that provisioned the same path.
pub type ModelHandle = Arc<dyn InferenceModel>;

/// Loads a model artifact. Called at most once per successful path.
pub type ModelLoader = dyn Fn(&Path) -> Result<ModelHandle, ModelLoadError> + Send + Sync;

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("ONNX Runtime error: {0}")]
    Runtime(String),
    #[error("Incompatible model: {0}")]
    Incompatible(String),
    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

type Slot = Arc<Mutex<Option<ModelHandle>>>;

/// Loads model artifacts once and hands out cached handles.
///
/// Each path owns a slot guarded by its own mutex. The first caller for a
/// path performs the load while holding the slot, so concurrent first
/// callers block and then reuse its handle instead of loading again. Failed
/// loads leave the slot empty and the next call retries.
///
/// Clones share the same cache.
#[derive(Clone)]
pub struct ModelManager {
    loader: Arc<ModelLoader>,
    slots: Arc<Mutex<HashMap<PathBuf, Slot>>>,
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached: Vec<PathBuf> = lock(&self.slots).keys().cloned().collect();
        f.debug_struct("ModelManager").field("paths", &cached).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded data is a cache entry that is only ever replaced whole,
    // so a panic in another holder cannot leave it half-written.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

lazy_static! {
    static ref GLOBAL_MANAGER: ModelManager = ModelManager::onnx(RuntimeConfig::default());
}

/// Returns the process-wide model manager backing [`provision`].
pub fn global() -> &'static ModelManager {
    &GLOBAL_MANAGER
}

/// Loads the ONNX model at `path` once per process and returns the cached
/// handle on every later call.
pub fn provision<P: AsRef<Path>>(path: P) -> Result<ModelHandle, ModelLoadError> {
    GLOBAL_MANAGER.provision(path)
}

impl ModelManager {
    /// Creates a manager that loads ONNX models with the given runtime settings
    pub fn onnx(config: RuntimeConfig) -> Self {
        Self::with_loader(move |path| {
            let model = OnnxModel::load(path, &config)?;
            Ok(Arc::new(model) as ModelHandle)
        })
    }

    /// Creates a manager with a custom loader
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn(&Path) -> Result<ModelHandle, ModelLoadError> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the default model path
    pub fn default_model_path() -> PathBuf {
        // 1. Explicit model file
        if let Ok(path) = env::var("WEEDWISE_MODEL") {
            return PathBuf::from(path);
        }
        Self::default_models_dir().join(DEFAULT_MODEL_FILE)
    }

    /// Returns the default models directory path
    pub fn default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("WEEDWISE_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("weedwise").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("weedwise").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("weedwise").join("models")
    }

    fn cache_key(path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    fn slot(&self, key: &Path) -> Slot {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(key.to_path_buf()).or_default();
        Arc::clone(slot)
    }

    /// Returns the cached handle for `path`, loading it on first use
    pub fn provision<P: AsRef<Path>>(&self, path: P) -> Result<ModelHandle, ModelLoadError> {
        self.provision_inner(path.as_ref(), None)
    }

    /// Like [`provision`](Self::provision), but checks the artifact's SHA-256
    /// before the first load. A handle that is already cached is returned
    /// without hashing again.
    pub fn provision_verified<P: AsRef<Path>>(
        &self,
        path: P,
        expected_hash: &str,
    ) -> Result<ModelHandle, ModelLoadError> {
        self.provision_inner(path.as_ref(), Some(expected_hash))
    }

    fn provision_inner(
        &self,
        path: &Path,
        expected_hash: Option<&str>,
    ) -> Result<ModelHandle, ModelLoadError> {
        let key = Self::cache_key(path);
        loop {
            let slot = self.slot(&key);
            let mut cached = lock(&slot);

            // A failed load may have released this slot while we waited on it
            if !self.is_registered(&key, &slot) {
                continue;
            }

            if let Some(handle) = cached.as_ref() {
                log::debug!("Using cached model for {:?}", key);
                return Ok(Arc::clone(handle));
            }

            return match self.load(&key, expected_hash) {
                Ok(handle) => {
                    *cached = Some(Arc::clone(&handle));
                    Ok(handle)
                }
                Err(e) => {
                    self.release(&key, &slot);
                    Err(e)
                }
            };
        }
    }

    fn is_registered(&self, key: &Path, slot: &Slot) -> bool {
        let slots = lock(&self.slots);
        slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    fn load(&self, key: &Path, expected_hash: Option<&str>) -> Result<ModelHandle, ModelLoadError> {
        if !key.exists() {
            log::error!("Model file not found: {:?}", key);
            return Err(ModelLoadError::NotFound(key.to_path_buf()));
        }

        if let Some(expected) = expected_hash {
            let actual = file_sha256(key)?;
            if !actual.eq_ignore_ascii_case(expected) {
                log::error!("Model hash mismatch: expected {}, got {}", expected, actual);
                return Err(ModelLoadError::HashMismatch {
                    path: key.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            log::info!("Model hash verified for {:?}", key);
        }

        log::info!("Loading model from {:?}", key);
        (self.loader)(key).map_err(|e| {
            log::error!("Failed to load model from {:?}: {}", key, e);
            e
        })
    }

    /// Forgets an empty slot after a failed load. Called with the slot held.
    fn release(&self, key: &Path, slot: &Slot) {
        let mut slots = lock(&self.slots);
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
    }

    /// Whether a loaded handle is cached for `path`
    pub fn is_cached<P: AsRef<Path>>(&self, path: P) -> bool {
        let key = Self::cache_key(path.as_ref());
        let slot = lock(&self.slots).get(&key).cloned();
        match slot {
            Some(slot) => {
                let loaded = lock(&slot).is_some();
                loaded
            }
            None => false,
        }
    }

    /// Drops every cached handle. Handles already given out stay valid.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Checks a file against an expected SHA-256 hex digest
    pub fn verify_file<P: AsRef<Path>>(
        path: P,
        expected_hash: &str,
    ) -> Result<bool, ModelLoadError> {
        let path = path.as_ref();
        log::info!("Verifying file: {:?}", path);
        let hash = file_sha256(path)?;
        log::info!("Calculated hash: {}", hash);
        log::info!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }
}

fn file_sha256(path: &Path) -> Result<String, ModelLoadError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationError;
    use ndarray::ArrayView4;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct Dummy;

    impl InferenceModel for Dummy {
        fn input_size(&self) -> Option<(usize, usize)> {
            Some((120, 120))
        }

        fn run(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, ClassificationError> {
            Ok(vec![1.0])
        }
    }

    fn counting_manager(delay: Duration) -> (ModelManager, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let manager = ModelManager::with_loader(move |_path| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(delay);
            Ok(Arc::new(Dummy) as ModelHandle)
        });
        (manager, loads)
    }

    fn model_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_provision_is_memoized() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let (manager, loads) = counting_manager(Duration::ZERO);

        let first = manager.provision(&path)?;
        let second = manager.provision(&path)?;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(manager.is_cached(&path));
        Ok(())
    }

    #[test]
    fn test_equivalent_paths_share_a_handle() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let dotted = dir.path().join(".").join("model.onnx");
        let (manager, loads) = counting_manager(Duration::ZERO);

        let a = manager.provision(&path)?;
        let b = manager.provision(&dotted)?;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_distinct_paths_load_separately() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let a = model_file(&dir, "a.onnx", b"a");
        let b = model_file(&dir, "b.onnx", b"b");
        let (manager, loads) = counting_manager(Duration::ZERO);

        let ha = manager.provision(&a)?;
        let hb = manager.provision(&b)?;
        assert!(!Arc::ptr_eq(&ha, &hb));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_concurrent_first_callers_load_once() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let (manager, loads) = counting_manager(Duration::from_millis(50));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.provision(&path)
                })
            })
            .collect();

        let results: Vec<ModelHandle> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Result<_, _>>()?;

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|h| Arc::ptr_eq(h, &results[0])));
        Ok(())
    }

    #[test]
    fn test_missing_artifact() {
        let (manager, loads) = counting_manager(Duration::ZERO);
        let result = manager.provision("/nonexistent/weedwise/model.onnx");
        assert!(matches!(result, Err(ModelLoadError::NotFound(_))));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_load_is_retried() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let manager = ModelManager::with_loader(move |_path| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ModelLoadError::Incompatible("truncated graph".to_string()))
            } else {
                Ok(Arc::new(Dummy) as ModelHandle)
            }
        });

        assert!(matches!(manager.provision(&path), Err(ModelLoadError::Incompatible(_))));
        assert!(!manager.is_cached(&path));
        assert!(manager.provision(&path).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_failures_leave_no_slots_behind() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let manager = ModelManager::with_loader(|_path| {
            Err(ModelLoadError::Incompatible("truncated graph".to_string()))
        });

        for i in 0..3 {
            let missing = dir.path().join(format!("missing-{}.onnx", i));
            assert!(manager.provision(&missing).is_err());
        }
        assert!(manager.provision(&path).is_err());
        assert!(manager.provision_verified(&path, "00").is_err());

        assert!(lock(&manager.slots).is_empty());
        Ok(())
    }

    #[test]
    fn test_clear_forces_reload() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"weights");
        let (manager, loads) = counting_manager(Duration::ZERO);

        let first = manager.provision(&path)?;
        manager.clear();
        let second = manager.provision(&path)?;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_hash_verification() -> Result<(), ModelLoadError> {
        let dir = tempfile::tempdir()?;
        let path = model_file(&dir, "model.onnx", b"hello");
        // sha256("hello")
        let good = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

        assert!(ModelManager::verify_file(&path, good)?);
        assert!(ModelManager::verify_file(&path, &good.to_uppercase())?);
        assert!(!ModelManager::verify_file(&path, "00")?);

        let (manager, loads) = counting_manager(Duration::ZERO);
        assert!(matches!(
            manager.provision_verified(&path, "00"),
            Err(ModelLoadError::HashMismatch { .. })
        ));
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        manager.provision_verified(&path, good)?;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_default_paths() {
        // Test with environment variables
        env::set_var("WEEDWISE_CACHE", "/tmp/test-weedwise");
        let dir = ModelManager::default_models_dir();
        assert!(dir.to_str().unwrap().contains("/tmp/test-weedwise/models"));
        env::remove_var("WEEDWISE_CACHE");

        let path = ModelManager::default_model_path();
        assert!(path.ends_with(DEFAULT_MODEL_FILE) || env::var("WEEDWISE_MODEL").is_ok());

        // Test without environment variable
        let dir = ModelManager::default_models_dir();
        assert!(dir.to_str().unwrap().contains("weedwise/models"));
    }

    #[test]
    fn test_global_manager_reports_missing_file() {
        let result = provision("/nonexistent/weedwise/global.onnx");
        assert!(matches!(result, Err(ModelLoadError::NotFound(_))));
        assert!(!global().is_cached("/nonexistent/weedwise/global.onnx"));
    }
}
