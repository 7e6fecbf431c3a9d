//! Signed-in user lifecycle
//!
//! Front ends depend on [`SessionProvider`] only to decide whether to show
//! the sign-in screens or the chat; the exchange controller never sees it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::auth::form::MIN_PASSWORD_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

/// Sign-in failures. The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailExists,
    #[error("This account has been disabled")]
    UserDisabled,
    #[error("Too many attempts. Please try again later")]
    TooManyAttempts,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Sign-in failed: {0}")]
    Provider(String),
    #[error("Could not store session: {0}")]
    Storage(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<&User>;

    async fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn signup(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AuthError>;

    async fn logout(&mut self) -> Result<(), AuthError>;
}

struct Account {
    user: User,
    password: String,
}

/// In-process account registry. Used for `--offline` runs and in tests.
#[derive(Default)]
pub struct MemorySessionProvider {
    accounts: HashMap<String, Account>,
    current: Option<User>,
}

impl MemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start already signed in as `user`
    pub fn signed_in(user: User) -> Self {
        Self {
            accounts: HashMap::new(),
            current: Some(user),
        }
    }
}

#[async_trait]
impl SessionProvider for MemorySessionProvider {
    fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self
            .accounts
            .get(&email.to_lowercase())
            .filter(|a| a.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        self.current = Some(account.user.clone());
        Ok(account.user.clone())
    }

    async fn signup(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let key = email.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(AuthError::EmailExists);
        }

        let user = User {
            uid: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            email: email.to_string(),
        };
        self.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        self.current = Some(user.clone());
        Ok(user)
    }

    async fn logout(&mut self) -> Result<(), AuthError> {
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signup_then_login() {
        let mut session = MemorySessionProvider::new();
        assert!(session.current_user().is_none());

        let user = session.signup("ana@example.com", "secret1", "Ana").await.unwrap();
        assert_eq!(user.display_name, "Ana");
        assert_eq!(session.current_user(), Some(&user));

        session.logout().await.unwrap();
        assert!(session.current_user().is_none());

        let again = session.login("ANA@example.com", "secret1").await.unwrap();
        assert_eq!(again.uid, user.uid);
    }

    #[tokio::test]
    async fn test_bad_password_is_rejected() {
        let mut session = MemorySessionProvider::new();
        session.signup("ana@example.com", "secret1", "Ana").await.unwrap();
        session.logout().await.unwrap();

        let err = session.login("ana@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_signup_policy() {
        let mut session = MemorySessionProvider::new();
        assert_eq!(
            session.signup("ana@example.com", "123", "Ana").await.unwrap_err(),
            AuthError::WeakPassword
        );
        assert_eq!(
            session.signup("not-an-email", "secret1", "Ana").await.unwrap_err(),
            AuthError::InvalidEmail
        );

        session.signup("ana@example.com", "secret1", "Ana").await.unwrap();
        assert_eq!(
            session.signup("ana@example.com", "secret2", "Other").await.unwrap_err(),
            AuthError::EmailExists
        );
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(AuthError::MissingFields.to_string(), "Please fill in all fields");
        assert_eq!(AuthError::PasswordMismatch.to_string(), "Passwords do not match");
    }
}
