use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `model_source` from the config file.
pub const MODEL_SOURCE_ENV: &str = "ARTGUARD_MODEL_SOURCE";

/// Default config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "artguard.toml";

/// Largest accepted `input_size`. The tensor holds `size * size * 3` floats.
pub const MAX_INPUT_SIZE: u32 = 2048;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("input_size must be between 1 and {max}, got {0}", max = MAX_INPUT_SIZE)]
    InputSize(u32),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Memory order of the input tensor handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, as produced by Keras-style exports.
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`, as produced by PyTorch-style exports.
    Nchw,
}

/// Configuration for the art classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path or http(s) URL of the ONNX model. `None` means unconfigured.
    pub model_source: Option<String>,
    /// Square input edge length the model expects.
    pub input_size: u32,
    pub layout: TensorLayout,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_source: None,
            input_size: 224,
            layout: TensorLayout::Nhwc,
        }
    }
}

impl ClassifierConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_INPUT_SIZE).contains(&self.input_size) {
            return Err(ConfigError::InputSize(self.input_size));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read the config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        let raw = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Blank values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = lookup(MODEL_SOURCE_ENV) {
            let source = source.trim();
            if !source.is_empty() {
                self.model_source = Some(source.to_string());
            }
        }
        self
    }

    /// The model source with surrounding whitespace removed, if any is set.
    pub fn model_source(&self) -> Option<&str> {
        self.model_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
