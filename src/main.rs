use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, error};
use swarmbridge::config::Config;
use swarmbridge::client::DispatchClient;
use swarmbridge::models::TaskSpec;
use swarmbridge::monitor::Monitor;
use swarmbridge::queue::TaskQueue;
use swarmbridge::registry::ModelRegistry;
use swarmbridge::worker::Worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt::init();
  let config_path = env::var("SWARMBRIDGE_CONFIG").unwrap_or_else(|_| "config/config.json".into());
  let config = Config::load(&config_path);

  let monitor = Arc::new(Monitor::new());
  let queue = Arc::new(TaskQueue::with_monitor(monitor.clone()));
  let client = Arc::new(DispatchClient::with_monitor(config.dispatch.clone(), monitor.clone()));

  // Validates the configured model credentials up front; routing itself is
  // the embedder's concern.
  let registry = ModelRegistry::new(config.models.clone())?;
  info!(
    "Model registry ready: {:?} (default: '{}')",
    registry.available_models(),
    registry.default_model()
  );

  let worker = Worker::new(queue.clone(), client.clone(), &config.worker);
  tokio::spawn(async move { worker.run().await });

  info!("Reading task submissions from stdin, one JSON object per line");
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await? {
    if line.trim().is_empty() {
      continue;
    }
    match serde_json::from_str::<TaskSpec>(&line) {
      Ok(task) => {
        let task_id = queue.enqueue(task).await;
        info!("Submitted task {}", task_id);
      }
      Err(e) => error!("Rejected task submission: {}", e),
    }
  }

  info!("Stdin closed; final metrics: {}", serde_json::to_string(&monitor.metrics())?);
  Ok(())
}
