use std::fs;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::warn;
use anyhow::{Context, Result};
use crate::models::{Endpoint, ModelConfig};

fn default_timeout_secs() -> u64 { 30 }

fn default_max_retries() -> usize { 3 }

fn default_retry_delay_ms() -> u64 { 1000 }

fn default_poll_interval_ms() -> u64 { 100 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
  #[serde(default)]
  pub endpoints: Vec<Endpoint>,
  #[serde(default = "default_timeout_secs")]
  pub default_timeout_secs: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: usize,
  #[serde(default = "default_retry_delay_ms")]
  pub retry_delay_ms: u64,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      endpoints: Vec::new(),
      default_timeout_secs: default_timeout_secs(),
      max_retries: default_max_retries(),
      retry_delay_ms: default_retry_delay_ms(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
  #[serde(default)]
  pub models: Vec<ModelConfig>,
  #[serde(default)]
  pub default_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  #[serde(default)]
  pub default_endpoint: Option<String>,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      poll_interval_ms: default_poll_interval_ms(),
      default_endpoint: None,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub dispatch: DispatchConfig,
  #[serde(default)]
  pub models: ModelsConfig,
  #[serde(default)]
  pub worker: WorkerConfig,
}

impl Config {
  // Missing or unreadable config falls back to defaults and writes them
  // out so the operator has a file to edit.
  pub fn load(path: impl Into<PathBuf>) -> Config {
    let path = path.into();
    match fs::read_to_string(&path) {
      Ok(raw) => match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
          warn!("Invalid config at {}: {}; using defaults", path.display(), e);
          let config = Config::default();
          let _ = config.save(&path);
          config
        }
      },
      Err(_) => {
        let config = Config::default();
        let _ = config.save(&path);
        config
      }
    }
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
          .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
      }
    }
    let raw = serde_json::to_string_pretty(self)?;
    fs::write(path, raw)
      .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
  }
}
