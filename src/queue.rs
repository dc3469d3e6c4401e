use std::collections::{BinaryHeap, HashMap};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use serde_json::Value;
use chrono::Utc;
use tracing::info;
use crate::error::QueueError;
use crate::models::{TaskRecord, TaskSpec, TaskStatus};
use crate::monitor::Monitor;

#[derive(Debug, Eq, PartialEq)]
struct PendingEntry {
  priority: u8,
  seq: u64,
  task_id: String,
}

// Max-heap on priority; lower seq wins among equal priorities so the
// dequeue order stays FIFO for ties.
impl PartialOrd for PendingEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for PendingEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    self.priority.cmp(&other.priority).then(other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct QueueState {
  pending: BinaryHeap<PendingEntry>,
  records: HashMap<String, TaskRecord>,
  next_seq: u64,
  last_id: u64,
}

// Priority queue plus per-task status table. A single lock guards both so
// that removal from the heap and the switch to in_progress are one
// atomic step from any reader's point of view.
pub struct TaskQueue {
  state: Mutex<QueueState>,
  monitor: Option<Arc<Monitor>>,
}

impl TaskQueue {
  pub fn new() -> Self {
    Self { state: Mutex::new(QueueState::default()), monitor: None }
  }

  pub fn with_monitor(monitor: Arc<Monitor>) -> Self {
    Self { state: Mutex::new(QueueState::default()), monitor: Some(monitor) }
  }

  pub async fn enqueue(&self, task: TaskSpec) -> String {
    let mut state = self.state.lock().await;
    let task_id = next_task_id(&mut state);
    let priority = task.priority;
    let now = Utc::now();
    let record = TaskRecord {
      id: task_id.clone(),
      priority,
      status: TaskStatus::Queued,
      task,
      result: None,
      error: None,
      created_at: now,
      updated_at: now,
    };
    let seq = state.next_seq;
    state.next_seq += 1;
    state.pending.push(PendingEntry { priority, seq, task_id: task_id.clone() });
    state.records.insert(task_id.clone(), record);
    let depth = state.pending.len();
    drop(state);
    info!("Task {} enqueued with priority {}", task_id, priority);
    if let Some(monitor) = &self.monitor {
      monitor.task_transition(&task_id, TaskStatus::Queued);
      monitor.queue_depth(depth);
    }
    task_id
  }

  pub async fn dequeue(&self) -> Option<TaskRecord> {
    let mut state = self.state.lock().await;
    let entry = state.pending.pop()?;
    let depth = state.pending.len();
    let record = state.records.get_mut(&entry.task_id)?;
    record.status = TaskStatus::InProgress;
    record.updated_at = Utc::now();
    let snapshot = record.clone();
    drop(state);
    if let Some(monitor) = &self.monitor {
      monitor.task_transition(&snapshot.id, TaskStatus::InProgress);
      monitor.queue_depth(depth);
    }
    Some(snapshot)
  }

  pub async fn complete(&self, task_id: &str, result: Value) -> Result<(), QueueError> {
    let mut state = self.state.lock().await;
    let record = state.records.get_mut(task_id)
      .ok_or_else(|| QueueError::UnknownTask(task_id.to_string()))?;
    record.status = TaskStatus::Completed;
    record.result = Some(result);
    record.updated_at = Utc::now();
    drop(state);
    info!("Task {} completed", task_id);
    if let Some(monitor) = &self.monitor {
      monitor.task_transition(task_id, TaskStatus::Completed);
    }
    Ok(())
  }

  pub async fn fail(&self, task_id: &str, error: String) -> Result<(), QueueError> {
    let mut state = self.state.lock().await;
    let record = state.records.get_mut(task_id)
      .ok_or_else(|| QueueError::UnknownTask(task_id.to_string()))?;
    record.status = TaskStatus::Failed;
    record.error = Some(error);
    record.updated_at = Utc::now();
    drop(state);
    info!("Task {} failed", task_id);
    if let Some(monitor) = &self.monitor {
      monitor.task_transition(task_id, TaskStatus::Failed);
    }
    Ok(())
  }

  pub async fn status(&self, task_id: &str) -> Option<TaskRecord> {
    self.state.lock().await.records.get(task_id).cloned()
  }

  pub async fn all_statuses(&self) -> HashMap<String, TaskRecord> {
    self.state.lock().await.records.clone()
  }

  pub async fn depth(&self) -> usize {
    self.state.lock().await.pending.len()
  }
}

impl Default for TaskQueue {
  fn default() -> Self {
    Self::new()
  }
}

// Ids are nanosecond timestamps forced strictly increasing under the queue
// lock, so concurrent enqueues can never collide.
fn next_task_id(state: &mut QueueState) -> String {
  let now = Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
  state.last_id = if now > state.last_id { now } else { state.last_id + 1 };
  state.last_id.to_string()
}
