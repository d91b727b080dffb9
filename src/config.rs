use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::audio::CaptureConfig;
use crate::client::PREVIEW_TEXT;
use crate::session::SessionConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub session: SessionConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-transcribe".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub text: String,
    pub word_interval_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            text: PREVIEW_TEXT.to_string(),
            word_interval_ms: 300,
        }
    }
}

impl PreviewConfig {
    pub fn word_interval(&self) -> Duration {
        Duration::from_millis(self.word_interval_ms)
    }
}

impl Config {
    /// Load from a config file (extension optional, e.g. "config/loqa-transcribe")
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid config {}", path))
    }

    /// Load from `path` if a matching file exists, otherwise use defaults
    pub fn load_or_default(path: &str) -> Result<Self> {
        let exists = ["", ".toml", ".json", ".yaml", ".yml"]
            .iter()
            .any(|ext| Path::new(&format!("{}{}", path, ext)).is_file());

        if exists {
            Self::load(path)
        } else {
            info!("No config found at {}, using defaults", path);
            Ok(Self::default())
        }
    }
}
