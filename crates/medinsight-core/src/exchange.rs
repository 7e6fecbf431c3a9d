//! Exchange controller
//!
//! Mediates one user turn at a time: the user's text goes into the log, one
//! request goes to the backend, and exactly one assistant turn comes back,
//! either the decoded answer or a fixed apology. The controller is the only
//! writer of the message log.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{AnswerBackend, BackendError, BackendResult};
use crate::decoder::decode_response;
use crate::state::{Author, ChatTurn, MessageStore};

/// Shown in place of an answer whenever the request fails for any reason
pub const EXCHANGE_ERROR: &str = "Sorry, something went wrong. Please try again.";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeEvent {
    Submit,
    Settle,
}

impl ExchangeState {
    /// The only transition table. `None` means the event is not allowed here.
    pub fn next(self, event: ExchangeEvent) -> Option<ExchangeState> {
        match (self, event) {
            (ExchangeState::Idle, ExchangeEvent::Submit) => Some(ExchangeState::Submitting),
            (ExchangeState::Submitting, ExchangeEvent::Settle) => Some(ExchangeState::Idle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Blank or whitespace-only text
    Empty,
    /// A request is already in flight
    Busy,
    /// `settle` arrived with nothing in flight
    NotSubmitting,
}

/// What a call into the controller did to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored(IgnoreReason),
    Answered,
    Failed,
}

pub type ExchangeResult = BackendResult<Value>;

/// A request that has been admitted but not yet sent. Owns everything it
/// needs so it can be moved onto a spawned task.
pub struct Exchange {
    query: String,
    backend: Arc<dyn AnswerBackend>,
    timeout: Duration,
}

impl Exchange {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub async fn run(self) -> ExchangeResult {
        match tokio::time::timeout(self.timeout, self.backend.ask(&self.query)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }
}

pub struct ExchangeController {
    store: MessageStore,
    state: ExchangeState,
    backend: Arc<dyn AnswerBackend>,
    timeout: Duration,
}

impl ExchangeController {
    pub fn new(backend: Arc<dyn AnswerBackend>) -> Self {
        Self {
            store: MessageStore::new(),
            state: ExchangeState::Idle,
            backend,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// An empty, idle controller on the same backend and timeout. Used when
    /// the session ends so nothing carries over to the next user.
    pub fn fresh(&self) -> Self {
        Self {
            store: MessageStore::new(),
            state: ExchangeState::Idle,
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        self.store.all()
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == ExchangeState::Submitting
    }

    fn transition(&mut self, event: ExchangeEvent) -> bool {
        match self.state.next(event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Admit a submission: record the user turn and enter `Submitting`.
    ///
    /// Returns `Err` with the reason when the call is a no-op. Every `Ok`
    /// must be followed by exactly one `settle`.
    pub fn try_begin(&mut self, text: &str) -> Result<Exchange, IgnoreReason> {
        let query = text.trim();
        if query.is_empty() {
            return Err(IgnoreReason::Empty);
        }
        if self.state != ExchangeState::Idle {
            debug!("submission ignored, request already in flight");
            return Err(IgnoreReason::Busy);
        }

        self.store.push(Author::User, query);
        self.transition(ExchangeEvent::Submit);
        info!(turns = self.store.len(), "exchange started");

        Ok(Exchange {
            query: query.to_string(),
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
        })
    }

    pub fn begin(&mut self, text: &str) -> Option<Exchange> {
        self.try_begin(text).ok()
    }

    /// Record the outcome of the in-flight exchange and return to `Idle`
    pub fn settle(&mut self, result: ExchangeResult) -> SubmitOutcome {
        if !self.transition(ExchangeEvent::Settle) {
            warn!("settle called with no exchange in flight");
            return SubmitOutcome::Ignored(IgnoreReason::NotSubmitting);
        }

        match result {
            Ok(body) => {
                self.store.push(Author::Assistant, decode_response(&body));
                info!("exchange answered");
                SubmitOutcome::Answered
            }
            Err(err) => {
                warn!(error = %err, "exchange failed");
                self.store.push(Author::Assistant, EXCHANGE_ERROR);
                SubmitOutcome::Failed
            }
        }
    }

    /// Run a whole exchange inline
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        match self.try_begin(text) {
            Ok(exchange) => {
                let result = exchange.run().await;
                self.settle(result)
            }
            Err(reason) => SubmitOutcome::Ignored(reason),
        }
    }
}
