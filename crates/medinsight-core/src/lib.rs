pub mod auth;
pub mod backend;
pub mod config;
pub mod decoder;
pub mod exchange;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use auth::{FirebaseAuth, LoginForm, PasswordStrength, RegisterForm};
pub use backend::{AnswerBackend, BackendError, InferenceClient};
pub use config::Config;
pub use decoder::{decode, decode_response, AnswerPayload, Resource, NO_RESPONSE};
pub use exchange::{
    Exchange, ExchangeController, ExchangeResult, ExchangeState, IgnoreReason, SubmitOutcome,
    EXCHANGE_ERROR,
};
pub use session::{AuthError, MemorySessionProvider, SessionProvider, User};
pub use state::{Author, ChatTurn, MessageStore};
