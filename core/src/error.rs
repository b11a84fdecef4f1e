use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Stage '{stage}' is not part of the workflow")]
  UnknownStage { stage: String },

  #[error("Stage '{stage}' already exists in the workflow")]
  DuplicateStage { stage: String },

  #[error("Required stage '{stage}' has no handlers")]
  HandlerMissing { stage: String },

  #[error("Context type mismatch: expected {expected}")]
  TypeMismatch { expected: String },

  #[error("No workflow registered for context type {context_type}")]
  Unregistered { context_type: String },

  #[error("Handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal workflow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    // An anyhow error that already wraps a FlowError is unwrapped instead of nested.
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::Handler { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
