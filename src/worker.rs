use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};
use crate::client::DispatchClient;
use crate::config::WorkerConfig;
use crate::models::{Endpoint, TaskRecord};
use crate::queue::TaskQueue;

// Drives the dequeue -> dispatch -> report cycle. Retry of transient
// connection failures lives in the client; a task that still fails is
// marked failed, never re-enqueued under the same id.
pub struct Worker {
  queue: Arc<TaskQueue>,
  client: Arc<DispatchClient>,
  poll_interval: Duration,
  default_endpoint: Option<String>,
}

impl Worker {
  pub fn new(queue: Arc<TaskQueue>, client: Arc<DispatchClient>, config: &WorkerConfig) -> Self {
    Self {
      queue,
      client,
      poll_interval: Duration::from_millis(config.poll_interval_ms),
      default_endpoint: config.default_endpoint.clone(),
    }
  }

  pub async fn run(&self) {
    info!("Worker started");
    loop {
      if !self.step().await {
        tokio::time::sleep(self.poll_interval).await;
      }
    }
  }

  // Serves at most one task; returns false when the queue was empty.
  pub async fn step(&self) -> bool {
    let Some(record) = self.queue.dequeue().await else {
      return false;
    };
    let outcome = self.dispatch(&record).await;
    let report = match outcome {
      Ok(response) => self.queue.complete(&record.id, response).await,
      Err(e) => self.queue.fail(&record.id, e).await,
    };
    if let Err(e) = report {
      error!("Failed to record outcome for task {}: {}", record.id, e);
    }
    true
  }

  async fn dispatch(&self, record: &TaskRecord) -> Result<serde_json::Value, String> {
    let Some(endpoint) = self.resolve_endpoint(record).await else {
      return Err("no active endpoint available".to_string());
    };
    self.client
      .send(&endpoint, &record.task.command, record.task.parameters.clone())
      .await
      .map_err(|e| e.to_string())
  }

  async fn resolve_endpoint(&self, record: &TaskRecord) -> Option<Endpoint> {
    if let Some(name) = record.task.endpoint.as_deref().or(self.default_endpoint.as_deref()) {
      return self.client.get_endpoint(name).await.filter(|e| e.active);
    }
    self.client.get_active_endpoints().await.into_iter().next()
  }
}
