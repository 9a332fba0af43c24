use crate::error::ClassifierError;
use crate::source::ModelSource;
use ndarray::Array4;
use std::sync::Arc;

/// A loaded model that maps one input tensor to one score per label.
pub trait InferenceModel: Send + Sync {
    /// Run a single forward pass. Blocking.
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>, ClassifierError>;
}

/// Acquires an [`InferenceModel`] from a model source. Blocking.
pub trait ModelLoader: Send + Sync {
    fn load(&self, source: &ModelSource) -> Result<Arc<dyn InferenceModel>, ClassifierError>;

    /// Name shown in logs and in the settings panel.
    fn backend_name(&self) -> &'static str;
}

/// Loader used when the crate is built without an inference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn load(&self, source: &ModelSource) -> Result<Arc<dyn InferenceModel>, ClassifierError> {
        Err(ClassifierError::model_load(format!(
            "cannot load {source}: built without ONNX Runtime support (enable the `ort` feature)"
        )))
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}

/// The production loader for this build.
pub fn default_loader() -> Arc<dyn ModelLoader> {
    #[cfg(feature = "ort")]
    {
        Arc::new(crate::onnx::OnnxLoader)
    }
    #[cfg(not(feature = "ort"))]
    {
        Arc::new(UnavailableLoader)
    }
}
