use crate::ClassificationResult;
use crate::backend::{InferenceModel, ModelLoader, default_loader};
use crate::config::{ClassifierConfig, TensorLayout};
use crate::error::ClassifierError;
use crate::labels::{ArtLabel, LABELS};
use crate::preprocess;
use crate::source::ModelSource;
use image::DynamicImage;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Art classifier with a lazily loaded model.
///
/// The model is loaded on the first [`Classifier::classify`] call. Concurrent
/// first calls share a single load; a failed load leaves the classifier
/// unloaded so the next call tries again.
pub struct Classifier {
    source: Option<String>,
    input_size: u32,
    layout: TensorLayout,
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn InferenceModel>>,
}

impl Classifier {
    /// Production wiring: the backend compiled into this build.
    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        Self::with_loader(cfg, default_loader())
    }

    pub fn with_loader(cfg: &ClassifierConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            source: cfg.model_source().map(str::to_string),
            input_size: cfg.input_size,
            layout: cfg.layout,
            loader,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.loader.backend_name()
    }

    /// Load the model unless it is already loaded.
    pub async fn ensure_model_loaded(&self) -> Result<(), ClassifierError> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&Arc<dyn InferenceModel>, ClassifierError> {
        self.model
            .get_or_try_init(|| async move {
                let raw = self.source.as_deref().ok_or_else(|| {
                    ClassifierError::configuration(
                        "no model source configured; set model_source in the config file",
                    )
                })?;
                let source = ModelSource::parse(raw)?;
                tracing::info!("loading model from {source} via {}", self.backend_name());
                let loader = Arc::clone(&self.loader);
                let result = tokio::task::spawn_blocking(move || loader.load(&source))
                    .await
                    .map_err(|e| ClassifierError::model_load(format!("load task failed: {e}")))?;
                if let Err(err) = &result {
                    tracing::warn!(kind = err.kind(), "model load failed: {err}");
                }
                result
            })
            .await
    }

    /// Classify one decoded image.
    pub async fn classify(
        &self,
        image: &DynamicImage,
    ) -> Result<ClassificationResult, ClassifierError> {
        self.model().await?;
        self.classify_shared(Arc::new(image.clone())).await
    }

    /// Like [`Classifier::classify`] for an image that is already shared,
    /// without copying it.
    pub async fn classify_shared(
        &self,
        image: Arc<DynamicImage>,
    ) -> Result<ClassificationResult, ClassifierError> {
        let model = Arc::clone(self.model().await?);
        let (size, layout) = (self.input_size, self.layout);
        let scores = tokio::task::spawn_blocking(move || {
            let input = preprocess::to_input_tensor(&image, size, layout)?;
            model.predict(input)
        })
        .await
        .map_err(|e| ClassifierError::inference(format!("inference task failed: {e}")))?
        .inspect_err(|err| tracing::warn!("forward pass failed: {err}"))?;
        tracing::debug!("scores {scores:?}");
        select_top(&scores)
    }
}

/// Pick the highest score. Ties resolve to the earliest label.
pub fn select_top(scores: &[f32]) -> Result<ClassificationResult, ClassifierError> {
    if scores.len() != LABELS.len() {
        return Err(ClassifierError::inference(format!(
            "expected {} scores, model returned {}",
            LABELS.len(),
            scores.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(ClassifierError::inference(format!(
            "model returned a non-finite score ({bad})"
        )));
    }
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    let label = ArtLabel::from_index(best)
        .ok_or_else(|| ClassifierError::inference(format!("no label for index {best}")))?;
    Ok(ClassificationResult {
        label,
        confidence: scores[best],
    })
}
