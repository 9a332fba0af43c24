//! Human-made vs. AI-generated artwork classification.
//!
//! [`Classifier`] owns a lazily loaded model and turns a decoded image into a
//! [`ClassificationResult`]. [`flow::UploadFlow`] drives one upload at a time
//! through selection, classification and the resulting notice.

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fixture;
pub mod flow;
pub mod labels;
#[cfg(feature = "ort")]
pub mod onnx;
pub mod preprocess;
pub mod source;

use serde::{Deserialize, Serialize};

pub use backend::{InferenceModel, ModelLoader, default_loader};
pub use classifier::{Classifier, select_top};
pub use config::{ClassifierConfig, ConfigError, TensorLayout};
pub use error::ClassifierError;
pub use flow::{FlowError, FlowState, Notice, NoticeKind, UploadFlow, is_supported_image};
pub use labels::{ArtLabel, LABELS};
pub use source::ModelSource;

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: ArtLabel,
    /// Score the model reported for `label`, in `[0, 1]` for softmax models.
    pub confidence: f32,
}

impl ClassificationResult {
    /// Confidence as a whole percentage, rounded half up.
    pub fn percentage(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.125, 13)]
    #[case(0.994, 99)]
    #[case(0.995, 100)]
    #[case(1.0, 100)]
    fn percentage_rounds_half_up(#[case] confidence: f32, #[case] expected: u32) {
        let result = ClassificationResult {
            label: ArtLabel::RealArt,
            confidence,
        };
        assert_eq!(result.percentage(), expected);
    }

    #[test]
    fn result_serializes_label_by_name() {
        let result = ClassificationResult {
            label: ArtLabel::AiArt,
            confidence: 0.75,
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"label":"AI Art","confidence":0.75}"#
        );
    }
}
