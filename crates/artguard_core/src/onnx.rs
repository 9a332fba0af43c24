//! ONNX Runtime backend.

use crate::backend::{InferenceModel, ModelLoader};
use crate::error::ClassifierError;
use crate::source::{self, ModelSource};
use ndarray::{Array4, CowArray};
use ort::{
    GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
    tensor::OrtOwnedTensor, value::Value,
};
use std::sync::Arc;

/// Builds ONNX Runtime sessions from local files or downloaded models.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn load(&self, source: &ModelSource) -> Result<Arc<dyn InferenceModel>, ClassifierError> {
        let local = source::materialize(source)?;
        let env = Environment::builder()
            .with_name("artguardian")
            .build()
            .map_err(|e| ClassifierError::model_load(format!("ONNX Runtime init failed: {e}")))?
            .into_arc();
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|b| b.with_model_from_file(local.path()))
            .map_err(|e| {
                ClassifierError::model_load(format!("cannot open ONNX model {source}: {e}"))
            })?;
        tracing::info!("ONNX session ready for {source}");
        Ok(Arc::new(OnnxModel { session }))
    }

    fn backend_name(&self) -> &'static str {
        "onnxruntime"
    }
}

/// A single ONNX session. The first output is read as the score vector.
pub struct OnnxModel {
    session: Session,
}

impl InferenceModel for OnnxModel {
    fn predict(&self, input: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let input_array = input.into_dyn();
        let cow = CowArray::from(input_array.view());
        let value = Value::from_array(self.session.allocator(), &cow)
            .map_err(|e| ClassifierError::inference(format!("cannot build input tensor: {e}")))?;
        let outputs: Vec<Value> = self
            .session
            .run(vec![value])
            .map_err(|e| ClassifierError::inference(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| ClassifierError::inference("model produced no output"))?;
        let scores: OrtOwnedTensor<f32, _> = first
            .try_extract()
            .map_err(|e| ClassifierError::inference(format!("unexpected output tensor: {e}")))?;
        let view = scores.view();
        Ok(view.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn corrupt_model_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"this is not a protobuf graph").unwrap();

        let err = OnnxLoader.load(&ModelSource::Path(path)).err().unwrap();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }

    #[test]
    fn directory_without_model_is_a_load_error() {
        let dir = tempdir().unwrap();
        let err = OnnxLoader
            .load(&ModelSource::Path(dir.path().to_path_buf()))
            .err()
            .unwrap();
        assert!(matches!(err, ClassifierError::ModelLoad(ref msg) if msg.contains("model.onnx")));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let source = ModelSource::Path(PathBuf::from("/nonexistent/art.onnx"));
        assert!(matches!(
            OnnxLoader.load(&source),
            Err(ClassifierError::ModelLoad(_))
        ));
    }

    #[test]
    fn default_loader_uses_onnxruntime() {
        assert_eq!(crate::default_loader().backend_name(), "onnxruntime");
    }
}
