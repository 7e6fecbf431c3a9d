use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::session::{AuthError, SessionProvider, User};

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// What survives a restart. The provider's tokens are not kept: nothing
/// after sign-in calls the provider on the user's behalf.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    user: User,
}

/// Email/password sign-in against the Firebase Identity Toolkit REST API
pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    base_url: String,
    session_path: Option<PathBuf>,
    current: Option<User>,
}

impl FirebaseAuth {
    pub fn new(api_key: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default identity client");
                Client::new()
            });
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: IDENTITY_BASE_URL.to_string(),
            session_path: None,
            current: None,
        }
    }

    /// Persist the signed-in user at `path`, restoring any session already
    /// stored there
    pub fn with_session_file(mut self, path: PathBuf) -> Self {
        self.current = load_session(&path).map(|stored| stored.user);
        if let Some(user) = &self.current {
            info!(email = %user.email, "restored saved session");
        }
        self.session_path = Some(path);
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(method, "identity request");
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            return Err(map_error_code(&code));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }

    /// Sign the user in for this run. A session file that cannot be written
    /// only costs the next start its automatic sign-in.
    fn remember(&mut self, user: User) -> User {
        if let Some(path) = &self.session_path {
            let stored = StoredSession { user: user.clone() };
            if let Err(e) = save_session(path, &stored) {
                warn!(error = %e, path = %path.display(), "session not saved");
            }
        }
        self.current = Some(user.clone());
        user
    }
}

#[async_trait]
impl SessionProvider for FirebaseAuth {
    fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        let tokens: TokenResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        info!(email, "signed in");
        Ok(self.remember(User {
            uid: tokens.local_id,
            display_name: tokens.display_name,
            email: tokens.email,
        }))
    }

    async fn signup(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<User, AuthError> {
        let tokens: TokenResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        // The account exists at this point; a failed profile update only
        // costs us the display name.
        let update = ProfileUpdateRequest {
            id_token: &tokens.id_token,
            display_name,
            return_secure_token: false,
        };
        if let Err(err) = self.call::<_, serde_json::Value>("update", &update).await {
            warn!(error = %err, "could not set display name");
        }

        info!(email, "account created");
        Ok(self.remember(User {
            uid: tokens.local_id,
            display_name: display_name.to_string(),
            email: if tokens.email.is_empty() {
                email.to_string()
            } else {
                tokens.email
            },
        }))
    }

    async fn logout(&mut self) -> Result<(), AuthError> {
        self.current = None;
        if let Some(path) = &self.session_path {
            clear_session_file(path)?;
        }
        info!("signed out");
        Ok(())
    }
}

/// Translate the provider's error code (e.g. `EMAIL_EXISTS`,
/// `WEAK_PASSWORD : Password should be ...`) into an [`AuthError`]
fn map_error_code(code: &str) -> AuthError {
    let key = code.split(':').next().unwrap_or_default().trim();
    match key {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "WEAK_PASSWORD" => AuthError::WeakPassword,
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        "MISSING_EMAIL" | "MISSING_PASSWORD" => AuthError::MissingFields,
        "USER_DISABLED" => AuthError::UserDisabled,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyAttempts,
        _ => AuthError::Provider(code.to_string()),
    }
}

fn load_session(path: &Path) -> Option<StoredSession> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(stored) => Some(stored),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "ignoring unreadable session file");
            None
        }
    }
}

fn save_session(path: &Path, stored: &StoredSession) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| AuthError::Storage(e.to_string()))?;
    }
    let content =
        serde_json::to_string_pretty(stored).map_err(|e| AuthError::Storage(e.to_string()))?;
    fs::write(path, content).map_err(|e| AuthError::Storage(e.to_string()))
}

/// Remove a persisted session. Missing files are fine.
pub fn clear_session_file(path: &Path) -> Result<(), AuthError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::Storage(e.to_string())),
    }
}
