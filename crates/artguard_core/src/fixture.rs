//! Test doubles for the classifier.
//!
//! Nothing in here reads a real model. [`Classifier::from_config`] never uses
//! these; they are only reachable by passing them to
//! [`Classifier::with_loader`] explicitly.
//!
//! [`Classifier::from_config`]: crate::Classifier::from_config
//! [`Classifier::with_loader`]: crate::Classifier::with_loader

use crate::backend::{InferenceModel, ModelLoader};
use crate::error::ClassifierError;
use crate::labels::LABELS;
use crate::source::ModelSource;
use ndarray::Array4;
use rand::Rng;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Returns the same scores for every input and counts forward passes.
#[derive(Debug)]
pub struct FixedScores {
    scores: Vec<f32>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl FixedScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A model whose every forward pass fails with `msg`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            scores: Vec::new(),
            fail_with: Some(msg.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceModel for FixedScores {
    fn predict(&self, _input: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(msg) => Err(ClassifierError::inference(msg.clone())),
            None => Ok(self.scores.clone()),
        }
    }
}

/// Mock classifier: a uniformly random label with a confidence in `[0.5, 1]`.
///
/// Placeholder output only. Never wire this into a shipped build.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomScores;

impl InferenceModel for RandomScores {
    fn predict(&self, _input: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let mut rng = rand::rng();
        let winner = rng.random_range(0..LABELS.len());
        let confidence: f32 = rng.random_range(0.5..=1.0);
        let mut scores = vec![1.0 - confidence; LABELS.len()];
        scores[winner] = confidence;
        Ok(scores)
    }
}

/// Hands out a prepared model and records how often it was asked to.
pub struct FixtureLoader {
    model: Arc<dyn InferenceModel>,
    delay: Duration,
    failures_left: AtomicUsize,
    loads: AtomicUsize,
    last_source: Mutex<Option<ModelSource>>,
}

impl FixtureLoader {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            model,
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            last_source: Mutex::new(None),
        }
    }

    /// Sleep this long inside every load, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` load attempts with a `ModelLoad` error.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Load attempts so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn last_source(&self) -> Option<ModelSource> {
        self.last_source.lock().ok().and_then(|s| s.clone())
    }
}

impl ModelLoader for FixtureLoader {
    fn load(&self, source: &ModelSource) -> Result<Arc<dyn InferenceModel>, ClassifierError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_source.lock() {
            *last = Some(source.clone());
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ClassifierError::model_load(format!(
                "fixture refused to load {source}"
            )));
        }
        Ok(Arc::clone(&self.model))
    }

    fn backend_name(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::select_top;
    use std::path::PathBuf;

    fn input() -> Array4<f32> {
        Array4::zeros((1, 2, 2, 3))
    }

    #[test]
    fn fixed_scores_count_calls() {
        let model = FixedScores::new(vec![0.1, 0.9]);
        assert_eq!(model.predict(input()).unwrap(), vec![0.1, 0.9]);
        assert_eq!(model.predict(input()).unwrap(), vec![0.1, 0.9]);
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn failing_model_reports_inference_error() {
        let model = FixedScores::failing("boom");
        assert_eq!(
            model.predict(input()),
            Err(ClassifierError::Inference("boom".into()))
        );
    }

    #[test]
    fn random_scores_always_select_a_valid_result() {
        for _ in 0..200 {
            let scores = RandomScores.predict(input()).unwrap();
            let result = select_top(&scores).unwrap();
            assert!((0.5..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn loader_fails_the_requested_number_of_times() {
        let loader = FixtureLoader::new(Arc::new(RandomScores)).failing_first(2);
        let source = ModelSource::Path(PathBuf::from("m.onnx"));
        assert!(loader.load(&source).is_err());
        assert!(loader.load(&source).is_err());
        assert!(loader.load(&source).is_ok());
        assert_eq!(loader.loads(), 3);
        assert_eq!(loader.last_source(), Some(source));
    }
}
