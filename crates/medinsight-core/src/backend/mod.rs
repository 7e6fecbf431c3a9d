//! Inference backend boundary
//!
//! The exchange controller only knows this trait; the reqwest client is one
//! implementation and tests supply their own.

pub mod inference;

pub use inference::InferenceClient;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Everything that can go wrong between sending a question and holding a
/// parsed JSON body. All of it is reported to the user the same way.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Could not reach the backend: {0}")]
    Transport(String),
    #[error("Backend returned status {0}")]
    Status(u16),
    #[error("Backend response was not valid JSON: {0}")]
    InvalidBody(String),
    #[error("Backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Request task ended unexpectedly: {0}")]
    Aborted(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Transport(err.to_string())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A service that answers free-text questions with a JSON body
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn ask(&self, query: &str) -> BackendResult<Value>;
}
