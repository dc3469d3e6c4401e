use std::collections::HashMap;
use std::sync::Mutex;
use regex::Regex;
use tracing::info;
use anyhow::{bail, Result};
use crate::config::ModelsConfig;
use crate::models::ModelConfig;

// Named model configurations the embedder routes LLM traffic with.
// Registration validates the credential shape up front; the provider call
// itself happens elsewhere.
pub struct ModelRegistry {
  models: Mutex<HashMap<String, ModelConfig>>,
  default_model: Mutex<String>,
  key_format: Regex,
}

impl ModelRegistry {
  pub fn new(config: ModelsConfig) -> Result<Self> {
    let registry = Self {
      models: Mutex::new(HashMap::new()),
      default_model: Mutex::new(config.default_model),
      key_format: Regex::new(r"^sk-[A-Za-z0-9]{32,}$")?,
    };
    for model in config.models {
      registry.register_model(model)?;
    }
    Ok(registry)
  }

  pub fn register_model(&self, model: ModelConfig) -> Result<()> {
    if !self.key_format.is_match(&model.api_key) {
      bail!("Invalid API key format for model '{}'", model.name);
    }
    if !model.api_base.is_empty()
      && !model.api_base.starts_with("http://")
      && !model.api_base.starts_with("https://")
    {
      bail!("Invalid API base URL for model '{}'", model.name);
    }
    info!("Registered model '{}'", model.name);
    let mut models = self.models.lock().unwrap_or_else(|e| e.into_inner());
    models.insert(model.name.clone(), model);
    Ok(())
  }

  pub fn remove_model(&self, name: &str) {
    let mut models = self.models.lock().unwrap_or_else(|e| e.into_inner());
    models.remove(name);
  }

  pub fn get_model(&self, name: &str) -> Option<ModelConfig> {
    let models = self.models.lock().unwrap_or_else(|e| e.into_inner());
    models.get(name).cloned()
  }

  pub fn available_models(&self) -> Vec<String> {
    let models = self.models.lock().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = models.keys().cloned().collect();
    names.sort();
    names
  }

  pub fn default_model(&self) -> String {
    self.default_model.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn set_default_model(&self, name: &str) -> Result<()> {
    if self.get_model(name).is_none() {
      bail!("Unknown model '{}'", name);
    }
    *self.default_model.lock().unwrap_or_else(|e| e.into_inner()) = name.to_string();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn model(name: &str, api_key: &str, api_base: &str) -> ModelConfig {
    ModelConfig {
      name: name.to_string(),
      api_key: api_key.to_string(),
      api_base: api_base.to_string(),
    }
  }

  #[test]
  fn rejects_malformed_api_keys() {
    let registry = ModelRegistry::new(ModelsConfig::default()).unwrap();
    assert!(registry.register_model(model("gpt", "not-a-key", "")).is_err());
    assert!(registry.register_model(model("gpt", "sk-short", "")).is_err());
    assert!(registry
      .register_model(model("gpt", &format!("sk-{}", "a".repeat(32)), ""))
      .is_ok());
  }

  #[test]
  fn rejects_non_http_api_base() {
    let registry = ModelRegistry::new(ModelsConfig::default()).unwrap();
    let key = format!("sk-{}", "b".repeat(32));
    assert!(registry.register_model(model("m", &key, "ftp://example.com")).is_err());
    assert!(registry.register_model(model("m", &key, "https://example.com")).is_ok());
  }

  #[test]
  fn tracks_default_model() {
    let registry = ModelRegistry::new(ModelsConfig::default()).unwrap();
    let key = format!("sk-{}", "c".repeat(32));
    registry.register_model(model("alpha", &key, "")).unwrap();
    registry.register_model(model("beta", &key, "")).unwrap();

    assert!(registry.set_default_model("missing").is_err());
    registry.set_default_model("beta").unwrap();
    assert_eq!(registry.default_model(), "beta");
    assert_eq!(registry.available_models(), vec!["alpha", "beta"]);

    registry.remove_model("beta");
    assert!(registry.get_model("beta").is_none());
  }
}
