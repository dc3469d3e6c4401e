use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use serde::Serialize;
use chrono::{DateTime, Utc};
use tracing::info;
use crate::models::TaskStatus;

#[derive(Debug, Default, Clone, Serialize)]
pub struct EndpointStats {
  pub started: u64,
  pub succeeded: u64,
  pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
  pub start_time: DateTime<Utc>,
  pub uptime_secs: i64,
  pub tasks_processed: u64,
  pub tasks_completed: u64,
  pub tasks_failed: u64,
  pub queue_depth: usize,
  pub endpoints: HashMap<String, EndpointStats>,
}

// Counter sink for task transitions and per-endpoint request outcomes.
// Transport (scrape endpoint, dashboard) is up to the embedder; this only
// keeps the numbers and logs the events.
pub struct Monitor {
  start_time: DateTime<Utc>,
  tasks_processed: AtomicU64,
  tasks_completed: AtomicU64,
  tasks_failed: AtomicU64,
  queue_depth: AtomicUsize,
  endpoints: Mutex<HashMap<String, EndpointStats>>,
}

impl Monitor {
  pub fn new() -> Self {
    Self {
      start_time: Utc::now(),
      tasks_processed: AtomicU64::new(0),
      tasks_completed: AtomicU64::new(0),
      tasks_failed: AtomicU64::new(0),
      queue_depth: AtomicUsize::new(0),
      endpoints: Mutex::new(HashMap::new()),
    }
  }

  pub fn task_transition(&self, task_id: &str, status: TaskStatus) {
    self.tasks_processed.fetch_add(1, Ordering::Relaxed);
    match status {
      TaskStatus::Completed => { self.tasks_completed.fetch_add(1, Ordering::Relaxed); }
      TaskStatus::Failed => { self.tasks_failed.fetch_add(1, Ordering::Relaxed); }
      _ => {}
    }
    info!(task_id, status = ?status, "task transition");
  }

  pub fn queue_depth(&self, depth: usize) {
    self.queue_depth.store(depth, Ordering::Relaxed);
  }

  pub fn request_started(&self, endpoint: &str) {
    self.with_endpoint(endpoint, |stats| stats.started += 1);
  }

  pub fn request_succeeded(&self, endpoint: &str) {
    self.with_endpoint(endpoint, |stats| stats.succeeded += 1);
  }

  pub fn request_failed(&self, endpoint: &str) {
    self.with_endpoint(endpoint, |stats| stats.failed += 1);
  }

  fn with_endpoint(&self, endpoint: &str, update: impl FnOnce(&mut EndpointStats)) {
    if let Ok(mut endpoints) = self.endpoints.lock() {
      update(endpoints.entry(endpoint.to_string()).or_default());
    }
  }

  pub fn metrics(&self) -> Metrics {
    let endpoints = self.endpoints.lock()
      .map(|map| map.clone())
      .unwrap_or_default();
    Metrics {
      start_time: self.start_time,
      uptime_secs: (Utc::now() - self.start_time).num_seconds(),
      tasks_processed: self.tasks_processed.load(Ordering::Relaxed),
      tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
      tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
      queue_depth: self.queue_depth.load(Ordering::Relaxed),
      endpoints,
    }
  }
}

impl Default for Monitor {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_terminal_transitions() {
    let monitor = Monitor::new();
    monitor.task_transition("1", TaskStatus::Queued);
    monitor.task_transition("1", TaskStatus::InProgress);
    monitor.task_transition("1", TaskStatus::Completed);
    monitor.task_transition("2", TaskStatus::Failed);

    let metrics = monitor.metrics();
    assert_eq!(metrics.tasks_processed, 4);
    assert_eq!(metrics.tasks_completed, 1);
    assert_eq!(metrics.tasks_failed, 1);
  }

  #[test]
  fn tracks_per_endpoint_requests() {
    let monitor = Monitor::new();
    monitor.request_started("local");
    monitor.request_started("local");
    monitor.request_succeeded("local");
    monitor.request_failed("remote");

    let metrics = monitor.metrics();
    assert_eq!(metrics.endpoints["local"].started, 2);
    assert_eq!(metrics.endpoints["local"].succeeded, 1);
    assert_eq!(metrics.endpoints["remote"].failed, 1);
  }
}
