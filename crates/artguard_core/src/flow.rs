//! Upload and classification flow, independent of any UI toolkit.
//!
//! ```text
//! Idle -> ImageSelected -> Classifying -> Resulted
//!              ^                      \-> Failed --(retry)--> Classifying
//!              '-- select_image from any state
//! ```

use crate::ClassificationResult;
use crate::classifier::Classifier;
use crate::error::ClassifierError;
use crate::preprocess;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Extensions the uploader accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

pub const MSG_CLASSIFIED: &str = "Classification complete!";
pub const MSG_CLASSIFY_FAILED: &str = "Failed to classify image. Please try again.";
pub const MSG_DECODE_FAILED: &str = "Failed to load image. Please try a different file.";

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    ImageSelected,
    Classifying,
    Resulted(ClassificationResult),
    /// User-facing message for the failed attempt.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("no image selected")]
    NoImage,
    #[error("a classification is already running")]
    AlreadyClassifying,
    #[error("image already classified; select a new image")]
    AlreadyClassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient message for the user, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub name: String,
    pub image: Arc<DynamicImage>,
}

/// Handed out by [`UploadFlow::begin_classification`]; the generation ties a
/// later outcome to the image it was computed for.
#[derive(Debug, Clone)]
pub struct ClassificationTicket {
    pub generation: u64,
    pub image: Arc<DynamicImage>,
}

#[derive(Debug)]
pub struct UploadFlow {
    state: FlowState,
    selected: Option<SelectedImage>,
    generation: u64,
}

impl Default for UploadFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            selected: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match &self.state {
            FlowState::Resulted(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_classifying(&self) -> bool {
        self.state == FlowState::Classifying
    }

    /// Whether [`begin_classification`](Self::begin_classification) would succeed.
    pub fn can_classify(&self) -> bool {
        matches!(self.state, FlowState::ImageSelected | FlowState::Failed(_))
    }

    /// Decode an upload and make it the current image. `name` must carry one
    /// of [`SUPPORTED_EXTENSIONS`].
    ///
    /// On a rejected upload the flow keeps its previous state and image.
    pub fn select_image(
        &mut self,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> Result<(), ClassifierError> {
        let name = name.into();
        if !is_supported_image(Path::new(&name)) {
            tracing::warn!("rejected upload {name}: unsupported file type");
            return Err(ClassifierError::image_decode(format!(
                "unsupported file type: {name}"
            )));
        }
        let image = preprocess::decode_image(bytes).inspect_err(|e| {
            tracing::warn!("rejected upload {name}: {e}");
        })?;
        self.replace_image(name, image);
        Ok(())
    }

    /// Like [`select_image`](Self::select_image) but reads from disk and
    /// rejects unsupported extensions up front.
    pub fn select_path(&mut self, path: &Path) -> Result<(), ClassifierError> {
        if !is_supported_image(path) {
            return Err(ClassifierError::image_decode(format!(
                "unsupported file type: {}",
                path.display()
            )));
        }
        let image = preprocess::open_image(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.replace_image(name, image);
        Ok(())
    }

    fn replace_image(&mut self, name: String, image: DynamicImage) {
        tracing::debug!("selected {name} ({}x{})", image.width(), image.height());
        self.generation += 1;
        self.selected = Some(SelectedImage {
            name,
            image: Arc::new(image),
        });
        self.state = FlowState::ImageSelected;
    }

    /// Drop the image and any result.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.state = FlowState::Idle;
    }

    /// Leave `Failed` without retrying.
    pub fn dismiss_error(&mut self) {
        if matches!(self.state, FlowState::Failed(_)) {
            self.state = FlowState::ImageSelected;
        }
    }

    /// Enter `Classifying`. Allowed from `ImageSelected`, and from `Failed` as a retry.
    pub fn begin_classification(&mut self) -> Result<ClassificationTicket, FlowError> {
        match self.state {
            FlowState::Idle => return Err(FlowError::NoImage),
            FlowState::Classifying => return Err(FlowError::AlreadyClassifying),
            FlowState::Resulted(_) => return Err(FlowError::AlreadyClassified),
            FlowState::ImageSelected | FlowState::Failed(_) => {}
        }
        let selected = self.selected.as_ref().ok_or(FlowError::NoImage)?;
        let ticket = ClassificationTicket {
            generation: self.generation,
            image: Arc::clone(&selected.image),
        };
        self.state = FlowState::Classifying;
        Ok(ticket)
    }

    /// Record the outcome for `generation`. Returns `None` when the outcome is
    /// stale because the image was replaced or cleared in the meantime.
    pub fn finish_classification(
        &mut self,
        generation: u64,
        outcome: Result<ClassificationResult, ClassifierError>,
    ) -> Option<Notice> {
        if generation != self.generation || !self.is_classifying() {
            tracing::debug!("discarding stale classification outcome");
            return None;
        }
        match outcome {
            Ok(result) => {
                tracing::info!(
                    "classified as {} ({:.1}%)",
                    result.label,
                    result.confidence * 100.0
                );
                self.state = FlowState::Resulted(result);
                Some(Notice::success(MSG_CLASSIFIED))
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), "classification failed: {err}");
                let message = match err {
                    ClassifierError::Configuration(_) => format!("{MSG_CLASSIFY_FAILED} ({err})"),
                    _ => MSG_CLASSIFY_FAILED.to_string(),
                };
                self.state = FlowState::Failed(message.clone());
                Some(Notice::error(message))
            }
        }
    }

    /// Run one classification of the current image to completion.
    pub async fn classify_with(
        &mut self,
        classifier: &Classifier,
    ) -> Result<Option<Notice>, FlowError> {
        let ticket = self.begin_classification()?;
        let outcome = classifier.classify_shared(ticket.image).await;
        Ok(self.finish_classification(ticket.generation, outcome))
    }
}

/// Whether a path has an extension the uploader accepts.
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::ArtLabel;
    use image::ImageFormat;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(8, 8)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn result(label: ArtLabel, confidence: f32) -> ClassificationResult {
        ClassificationResult { label, confidence }
    }

    fn selected_flow() -> UploadFlow {
        let mut flow = UploadFlow::new();
        flow.select_image("a.png", &png_bytes()).unwrap();
        flow
    }

    #[test]
    fn starts_idle_and_refuses_to_classify() {
        let mut flow = UploadFlow::new();
        assert_eq!(flow.state(), &FlowState::Idle);
        assert!(!flow.can_classify());
        assert_eq!(flow.begin_classification().unwrap_err(), FlowError::NoImage);
    }

    #[test]
    fn selecting_an_image_enters_image_selected() {
        let flow = selected_flow();
        assert_eq!(flow.state(), &FlowState::ImageSelected);
        assert_eq!(flow.selected().unwrap().name, "a.png");
        assert!(flow.can_classify());
    }

    #[test]
    fn success_moves_to_resulted_with_notice() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        assert!(flow.is_classifying());
        let notice = flow.finish_classification(ticket.generation, Ok(result(ArtLabel::AiArt, 0.8)));
        assert_eq!(notice, Some(Notice::success(MSG_CLASSIFIED)));
        assert_eq!(flow.result(), Some(&result(ArtLabel::AiArt, 0.8)));
    }

    #[test]
    fn only_one_classification_in_flight() {
        let mut flow = selected_flow();
        flow.begin_classification().unwrap();
        assert_eq!(
            flow.begin_classification().unwrap_err(),
            FlowError::AlreadyClassifying
        );
    }

    #[test]
    fn resulted_refuses_reclassification() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        flow.finish_classification(ticket.generation, Ok(result(ArtLabel::RealArt, 0.6)));
        assert_eq!(
            flow.begin_classification().unwrap_err(),
            FlowError::AlreadyClassified
        );
    }

    #[test]
    fn failure_surfaces_error_and_allows_retry() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        let notice = flow
            .finish_classification(ticket.generation, Err(ClassifierError::inference("bad tensor")))
            .unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, MSG_CLASSIFY_FAILED);
        assert!(matches!(flow.state(), FlowState::Failed(_)));
        assert!(flow.selected().is_some());

        let retry = flow.begin_classification().unwrap();
        flow.finish_classification(retry.generation, Ok(result(ArtLabel::RealArt, 0.7)));
        assert!(flow.result().is_some());
    }

    #[test]
    fn configuration_failures_name_the_cause() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        let notice = flow
            .finish_classification(
                ticket.generation,
                Err(ClassifierError::configuration("no model source configured")),
            )
            .unwrap();
        assert!(notice.message.contains("no model source configured"));
    }

    #[test]
    fn dismissing_an_error_returns_to_image_selected() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        flow.finish_classification(ticket.generation, Err(ClassifierError::model_load("404")));
        flow.dismiss_error();
        assert_eq!(flow.state(), &FlowState::ImageSelected);
    }

    #[rstest]
    #[case::after_result(true)]
    #[case::after_failure(false)]
    fn new_selection_discards_previous_outcome(#[case] succeed: bool) {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        let outcome = if succeed {
            Ok(result(ArtLabel::AiArt, 0.9))
        } else {
            Err(ClassifierError::inference("x"))
        };
        flow.finish_classification(ticket.generation, outcome);

        flow.select_image("b.png", &png_bytes()).unwrap();
        assert_eq!(flow.state(), &FlowState::ImageSelected);
        assert!(flow.result().is_none());
        assert_eq!(flow.selected().unwrap().name, "b.png");
    }

    #[test]
    fn outcome_for_a_replaced_image_is_discarded() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        flow.select_image("b.png", &png_bytes()).unwrap();
        let notice = flow.finish_classification(ticket.generation, Ok(result(ArtLabel::AiArt, 0.9)));
        assert_eq!(notice, None);
        assert_eq!(flow.state(), &FlowState::ImageSelected);
    }

    #[test]
    fn clear_resets_to_idle() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        flow.clear();
        assert_eq!(flow.state(), &FlowState::Idle);
        assert!(flow.selected().is_none());
        assert_eq!(
            flow.finish_classification(ticket.generation, Ok(result(ArtLabel::RealArt, 1.0))),
            None
        );
    }

    #[test]
    fn decode_failure_keeps_previous_state() {
        let mut flow = selected_flow();
        let ticket = flow.begin_classification().unwrap();
        flow.finish_classification(ticket.generation, Ok(result(ArtLabel::RealArt, 0.55)));

        let err = flow.select_image("notes.png", b"not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::ImageDecode(_)));
        assert_eq!(flow.result(), Some(&result(ArtLabel::RealArt, 0.55)));
        assert_eq!(flow.selected().unwrap().name, "a.png");
    }

    #[rstest]
    #[case("drawing.bmp")]
    #[case("notes.txt")]
    #[case("no_extension")]
    fn dropped_bytes_with_unsupported_name_are_rejected(#[case] name: &str) {
        let mut flow = selected_flow();
        let err = flow.select_image(name, &png_bytes()).unwrap_err();
        assert!(matches!(err, ClassifierError::ImageDecode(_)));
        assert_eq!(flow.state(), &FlowState::ImageSelected);
        assert_eq!(flow.selected().unwrap().name, "a.png");
    }

    #[rstest]
    #[case("a.JPG", true)]
    #[case("b.jpeg", true)]
    #[case("c.png", true)]
    #[case("d.WebP", true)]
    #[case("e.gif", true)]
    #[case("f.bmp", false)]
    #[case("notes.txt", false)]
    #[case("no_extension", false)]
    fn supported_extensions(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_supported_image(Path::new(name)), expected);
    }

    #[test]
    fn select_path_reads_supported_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("art.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let mut flow = UploadFlow::new();
        flow.select_path(&path).unwrap();
        assert_eq!(flow.selected().unwrap().name, "art.png");
    }

    #[test]
    fn select_path_rejects_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("art.txt");
        File::create(&path).unwrap();
        let mut flow = UploadFlow::new();
        assert!(matches!(
            flow.select_path(&path),
            Err(ClassifierError::ImageDecode(_))
        ));
        assert_eq!(flow.state(), &FlowState::Idle);
    }
}
