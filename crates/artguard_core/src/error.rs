use thiserror::Error;

/// Failures surfaced by the classifier and by image intake.
///
/// Each variant maps to a distinct operator action, so they are never folded
/// into one another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// No usable model source is configured.
    #[error("classifier is not configured: {0}")]
    Configuration(String),
    /// The model source was unreachable, missing or malformed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    /// The forward pass failed for a single request.
    #[error("inference failed: {0}")]
    Inference(String),
    /// The upload could not be decoded as an image.
    #[error("could not decode image: {0}")]
    ImageDecode(String),
}

impl ClassifierError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    /// Short stable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ModelLoad(_) => "model_load",
            Self::Inference(_) => "inference",
            Self::ImageDecode(_) => "image_decode",
        }
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecode(err.to_string())
    }
}
