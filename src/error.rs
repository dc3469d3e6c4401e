#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  #[error("endpoint '{0}' is not active")]
  EndpointInactive(String),

  #[error("transient connection failure: {0}")]
  Transient(String),

  #[error("connection failed after {attempts} attempts: {last}")]
  ConnectionExhausted { attempts: usize, last: String },

  #[error("malformed response body: {0}")]
  MalformedResponse(String),
}

impl DispatchError {
  pub fn is_transient(&self) -> bool {
    matches!(self, DispatchError::Transient(_))
  }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
  #[error("unknown task id: {0}")]
  UnknownTask(String),
}
