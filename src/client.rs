use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tracing::{info, error};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::models::Endpoint;
use crate::monitor::Monitor;

// Delivers one command to one endpoint over a fresh WebSocket connection
// per attempt. Transient failures (refused, closed, timed out) are retried
// on a fixed interval up to max_retries total attempts; anything else
// surfaces immediately.
pub struct DispatchClient {
  endpoints: Mutex<Vec<Endpoint>>,
  default_timeout: Duration,
  max_retries: usize,
  retry_delay: Duration,
  monitor: Option<Arc<Monitor>>,
}

impl DispatchClient {
  pub fn new(config: DispatchConfig) -> Self {
    Self {
      endpoints: Mutex::new(config.endpoints),
      default_timeout: Duration::from_secs(config.default_timeout_secs),
      max_retries: config.max_retries.max(1),
      retry_delay: Duration::from_millis(config.retry_delay_ms),
      monitor: None,
    }
  }

  pub fn with_monitor(config: DispatchConfig, monitor: Arc<Monitor>) -> Self {
    let mut client = Self::new(config);
    client.monitor = Some(monitor);
    client
  }

  pub async fn send(
    &self,
    endpoint: &Endpoint,
    command: &str,
    params: serde_json::Map<String, Value>,
  ) -> Result<Value, DispatchError> {
    if !endpoint.active {
      return Err(DispatchError::EndpointInactive(endpoint.name.clone()));
    }

    let payload = serde_json::json!({
      "command": command,
      "params": Value::Object(params),
      "api_key": endpoint.api_key,
    })
    .to_string();
    let timeout = endpoint.timeout_secs
      .map(Duration::from_secs)
      .unwrap_or(self.default_timeout);

    if let Some(monitor) = &self.monitor {
      monitor.request_started(&endpoint.name);
    }

    let strategy = FixedInterval::new(self.retry_delay).take(self.max_retries - 1);
    let result = RetryIf::spawn(
      strategy,
      || attempt(&endpoint.url, &payload, timeout),
      DispatchError::is_transient,
    )
    .await;

    match result {
      Ok(response) => {
        info!("Command '{}' dispatched to endpoint '{}'", command, endpoint.name);
        if let Some(monitor) = &self.monitor {
          monitor.request_succeeded(&endpoint.name);
        }
        Ok(response)
      }
      Err(err) => {
        if let Some(monitor) = &self.monitor {
          monitor.request_failed(&endpoint.name);
        }
        let err = if err.is_transient() {
          DispatchError::ConnectionExhausted {
            attempts: self.max_retries,
            last: err.to_string(),
          }
        } else {
          err
        };
        error!("Dispatch to endpoint '{}' failed: {}", endpoint.name, err);
        Err(err)
      }
    }
  }

  pub async fn add_endpoint(&self, endpoint: Endpoint) {
    self.endpoints.lock().await.push(endpoint);
  }

  pub async fn remove_endpoint(&self, name: &str) {
    self.endpoints.lock().await.retain(|e| e.name != name);
  }

  pub async fn get_endpoint(&self, name: &str) -> Option<Endpoint> {
    self.endpoints.lock().await.iter().find(|e| e.name == name).cloned()
  }

  pub async fn get_active_endpoints(&self) -> Vec<Endpoint> {
    self.endpoints.lock().await.iter().filter(|e| e.active).cloned().collect()
  }
}

// One connect/send/receive cycle, bounded by the endpoint timeout. The
// socket is owned by this future, so every exit path (including
// cancellation) releases it.
async fn attempt(url: &str, payload: &str, timeout: Duration) -> Result<Value, DispatchError> {
  let exchange = async {
    let (mut ws, _) = connect_async(url)
      .await
      .map_err(|e| DispatchError::Transient(e.to_string()))?;
    ws.send(Message::Text(payload.to_string()))
      .await
      .map_err(|e| DispatchError::Transient(e.to_string()))?;
    while let Some(frame) = ws.next().await {
      match frame {
        Ok(Message::Text(body)) => {
          let value = serde_json::from_str(&body)
            .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
          let _ = ws.close(None).await;
          return Ok(value);
        }
        Ok(Message::Binary(body)) => {
          let value = serde_json::from_slice(&body)
            .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
          let _ = ws.close(None).await;
          return Ok(value);
        }
        Ok(Message::Close(_)) => break,
        Ok(_) => continue,
        Err(e) => return Err(DispatchError::Transient(e.to_string())),
      }
    }
    Err(DispatchError::Transient("connection closed before response".to_string()))
  };

  match tokio::time::timeout(timeout, exchange).await {
    Ok(result) => result,
    Err(_) => Err(DispatchError::Transient("attempt timed out".to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn endpoint(name: &str, active: bool) -> Endpoint {
    Endpoint {
      name: name.to_string(),
      url: format!("ws://127.0.0.1:1/{}", name),
      api_key: "sk-test".to_string(),
      timeout_secs: None,
      active,
    }
  }

  #[tokio::test]
  async fn directory_filters_active_endpoints() {
    let client = DispatchClient::new(DispatchConfig::default());
    client.add_endpoint(endpoint("a", true)).await;
    client.add_endpoint(endpoint("b", false)).await;
    client.add_endpoint(endpoint("c", true)).await;

    let active = client.get_active_endpoints().await;
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|e| e.active));

    client.remove_endpoint("a").await;
    assert_eq!(client.get_active_endpoints().await.len(), 1);
    assert!(client.get_endpoint("a").await.is_none());
    assert!(client.get_endpoint("b").await.is_some());
  }

  #[tokio::test]
  async fn inactive_endpoint_fails_without_network() {
    let client = DispatchClient::new(DispatchConfig::default());
    let err = client
      .send(&endpoint("off", false), "ping", serde_json::Map::new())
      .await
      .unwrap_err();
    assert!(matches!(err, DispatchError::EndpointInactive(name) if name == "off"));
  }
}
