//! Resolving a configured model location to a local file.

use crate::error::ClassifierError;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use url::Url;

/// File looked up inside a directory or base URL.
pub const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// Where the model artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Path(PathBuf),
    Url(Url),
}

impl ModelSource {
    /// Interpret a configured string. `http://` and `https://` become URLs,
    /// anything else a filesystem path.
    pub fn parse(raw: &str) -> Result<Self, ClassifierError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ClassifierError::configuration("model source is empty"));
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(raw).map_err(|e| {
                ClassifierError::configuration(format!("invalid model URL {raw}: {e}"))
            })?;
            return Ok(Self::Url(url));
        }
        Ok(Self::Path(PathBuf::from(raw)))
    }

    /// Apply the base-location convention: a URL ending in `/` points at
    /// `model.onnx` below it.
    fn resolved_url(url: &Url) -> Result<Url, ClassifierError> {
        if url.path().ends_with('/') {
            url.join(DEFAULT_MODEL_FILE).map_err(|e| {
                ClassifierError::configuration(format!("invalid model URL {url}: {e}"))
            })
        } else {
            Ok(url.clone())
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(p) => write!(f, "{}", p.display()),
            ModelSource::Url(u) => write!(f, "{u}"),
        }
    }
}

/// A model file on local disk. Downloads live in a temp file that is removed
/// when this value drops.
#[derive(Debug)]
pub enum LocalModel {
    File(PathBuf),
    Downloaded(NamedTempFile),
}

impl LocalModel {
    pub fn path(&self) -> &Path {
        match self {
            LocalModel::File(p) => p,
            LocalModel::Downloaded(tmp) => tmp.path(),
        }
    }
}

/// Make the model available as a local file. Blocks on network I/O for URLs.
pub fn materialize(source: &ModelSource) -> Result<LocalModel, ClassifierError> {
    match source {
        ModelSource::Path(path) => resolve_path(path).map(LocalModel::File),
        ModelSource::Url(url) => download(url).map(LocalModel::Downloaded),
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf, ClassifierError> {
    let candidate = if path.is_dir() {
        path.join(DEFAULT_MODEL_FILE)
    } else {
        path.to_path_buf()
    };
    if !candidate.is_file() {
        return Err(ClassifierError::model_load(format!(
            "model file is missing: {}",
            candidate.display()
        )));
    }
    Ok(candidate)
}

fn download(url: &Url) -> Result<NamedTempFile, ClassifierError> {
    let url = ModelSource::resolved_url(url)?;
    tracing::info!("downloading model from {url}");
    let response = reqwest::blocking::get(url.as_str())
        .map_err(|e| ClassifierError::model_load(format!("request to {url} failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClassifierError::model_load(format!(
            "download of {url} failed: HTTP {status}"
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|e| ClassifierError::model_load(format!("reading {url} failed: {e}")))?;
    if bytes.is_empty() {
        return Err(ClassifierError::model_load(format!("{url} returned an empty body")));
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("artguard-model-")
        .suffix(".onnx")
        .tempfile()
        .map_err(|e| ClassifierError::model_load(format!("cannot stage download: {e}")))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| ClassifierError::model_load(format!("cannot stage download: {e}")))?;
    tracing::debug!("staged {} bytes at {}", bytes.len(), tmp.path().display());
    Ok(tmp)
}
