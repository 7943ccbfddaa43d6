//! Model handle: the Unloaded → Loaded state machine around the classifier.
//!
//! The handle is owned by the server state and handed to every request. The
//! only transition is [`ModelHandle::ensure_loaded`]: callers race on a
//! `tokio::sync::OnceCell`, exactly one load runs at a time on the blocking
//! pool, a failure leaves the handle unloaded so the next request retries, and
//! a success is permanent.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::classifier::{Classifier, ModelLoader, OnnxLoader};
use crate::error::InferenceError;

/// Default model location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "pneumonia_detection_model.onnx";

/// A classifier that finished loading, plus what we know about its file.
pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    /// `sha256:<hex>` of the model file, when it could be read.
    pub hash: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("hash", &self.hash)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

pub struct ModelHandle {
    path: PathBuf,
    loader: Arc<dyn ModelLoader>,
    state: OnceCell<Arc<LoadedModel>>,
}

impl ModelHandle {
    /// Handle that loads ONNX models from `path`.
    pub fn onnx(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, Arc::new(OnnxLoader))
    }

    pub fn with_loader(path: impl Into<PathBuf>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            path: path.into(),
            loader,
            state: OnceCell::new(),
        }
    }

    /// Handle that is already loaded with the given classifier.
    pub fn preloaded(path: impl Into<PathBuf>, classifier: Arc<dyn Classifier>) -> Self {
        let loaded = Arc::new(LoadedModel {
            classifier,
            hash: None,
            loaded_at: Utc::now(),
        });
        Self {
            path: path.into(),
            loader: Arc::new(OnnxLoader),
            state: OnceCell::new_with(Some(loaded)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.state.initialized()
    }

    /// The loaded model, without attempting a load.
    pub fn get(&self) -> Option<Arc<LoadedModel>> {
        self.state.get().cloned()
    }

    /// Load the model if it is not loaded yet. Idempotent.
    pub async fn ensure_loaded(&self) -> Result<Arc<LoadedModel>, InferenceError> {
        self.state
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let loader = Arc::clone(&self.loader);
                let loaded = tokio::task::spawn_blocking(move || load(loader.as_ref(), &path))
                    .await??;
                Ok::<_, InferenceError>(Arc::new(loaded))
            })
            .await
            .cloned()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn load(loader: &dyn ModelLoader, path: &Path) -> Result<LoadedModel, InferenceError> {
    let start = std::time::Instant::now();
    let classifier = match loader.load(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(model = %path.display(), error = %e, "model load failed");
            return Err(e);
        }
    };
    let hash = crate::model_hash(path).ok();
    info!(
        model = %path.display(),
        hash = hash.as_deref().unwrap_or("unavailable"),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "model loaded"
    );
    Ok(LoadedModel {
        classifier,
        hash,
        loaded_at: Utc::now(),
    })
}
