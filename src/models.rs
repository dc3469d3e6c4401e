use serde::{Serialize, Deserialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

fn default_priority() -> u8 { 1 }

fn default_active() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
  pub name: String,
  pub url: String,
  pub api_key: String,
  #[serde(default)]
  pub timeout_secs: Option<u64>,
  #[serde(default = "default_active")]
  pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
  pub command: String,
  #[serde(default)]
  pub parameters: serde_json::Map<String, Value>,
  #[serde(default)]
  pub endpoint: Option<String>,
  #[serde(default = "default_priority")]
  pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Queued,
  InProgress,
  Completed,
  Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
  pub id: String,
  pub priority: u8,
  pub status: TaskStatus,
  pub task: TaskSpec,
  pub result: Option<Value>,
  pub error: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
  pub name: String,
  pub api_key: String,
  #[serde(default)]
  pub api_base: String,
}
