use medinsight_core::{
    AuthError, BackendError, ChatTurn, ExchangeController, ExchangeResult, LoginForm,
    RegisterForm, SessionProvider, User,
};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Longest the UI waits on the identity provider before giving the form back
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Chat,
}

/// State of the sign-in form
#[derive(Debug, Default)]
pub struct LoginState {
    pub form: LoginForm,
    pub focus: usize,
    pub error: Option<String>,
    pub loading: bool,
}

impl LoginState {
    pub const FIELDS: usize = 2;

    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.form.email,
            _ => &mut self.form.password,
        }
    }
}

/// State of the create-account form
#[derive(Debug, Default)]
pub struct RegisterState {
    pub form: RegisterForm,
    pub focus: usize,
    pub error: Option<String>,
    pub loading: bool,
}

impl RegisterState {
    pub const FIELDS: usize = 4;

    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.form.display_name,
            1 => &mut self.form.email,
            2 => &mut self.form.password,
            _ => &mut self.form.confirm_password,
        }
    }
}

/// Sign-in work queued by the key handler and run by the event loop after
/// the loading state has been drawn
#[derive(Debug)]
pub enum AuthRequest {
    Login(LoginForm),
    Signup(RegisterForm),
    Logout,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,

    // Auth screens
    pub login: LoginState,
    pub register: RegisterState,
    pub auth_request: Option<AuthRequest>,
    pub session: Box<dyn SessionProvider>,
    pub auth_timeout: Duration,

    // Chat
    pub controller: ExchangeController,
    pub exchange_task: Option<JoinHandle<ExchangeResult>>,
    pub input: String,
    pub input_cursor: usize, // in chars, not bytes
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16,
    pub animation_frame: u8,
}

impl App {
    pub fn new(session: Box<dyn SessionProvider>, controller: ExchangeController) -> Self {
        let screen = if session.current_user().is_some() {
            Screen::Chat
        } else {
            Screen::Login
        };

        Self {
            should_quit: false,
            screen,
            login: LoginState::default(),
            register: RegisterState::default(),
            auth_request: None,
            session,
            auth_timeout: AUTH_TIMEOUT,
            controller,
            exchange_task: None,
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            animation_frame: 0,
        }
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.current_user()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        self.controller.turns()
    }

    pub fn is_pending(&self) -> bool {
        self.controller.is_pending()
    }

    /// Send the input line as a new exchange. Does nothing while a request is
    /// in flight or when the line is blank.
    pub fn submit_input(&mut self) {
        let Some(exchange) = self.controller.begin(&self.input) else {
            return;
        };

        self.input.clear();
        self.input_cursor = 0;
        self.follow_tail = true;
        self.exchange_task = Some(tokio::spawn(exchange.run()));
    }

    /// Settle the exchange once its task is done. A task that panicked or was
    /// aborted still settles, as a failure.
    pub async fn poll_exchange(&mut self) {
        let finished = self
            .exchange_task
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.exchange_task.take() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "exchange task did not complete");
                    Err(BackendError::Aborted(e.to_string()))
                }
            };
            self.controller.settle(result);
            self.follow_tail = true;
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        self.login.error = None;
        self.register.error = None;
        self.screen = screen;
    }

    /// Run whatever sign-in work the handler queued
    pub async fn run_auth_request(&mut self) {
        let Some(request) = self.auth_request.take() else {
            return;
        };

        let limit = self.auth_timeout;
        match request {
            AuthRequest::Login(form) => {
                let result =
                    within(limit, self.session.login(form.email.trim(), &form.password)).await;
                self.login.loading = false;
                match result {
                    Ok(user) => self.enter_chat(user),
                    Err(e) => self.login.error = Some(auth_message(e)),
                }
            }
            AuthRequest::Signup(form) => {
                let result = within(
                    limit,
                    self.session
                        .signup(form.email.trim(), &form.password, form.display_name.trim()),
                )
                .await;
                self.register.loading = false;
                match result {
                    Ok(user) => self.enter_chat(user),
                    Err(e) => self.register.error = Some(auth_message(e)),
                }
            }
            AuthRequest::Logout => {
                if let Err(e) = within(limit, self.session.logout()).await {
                    warn!(error = %e, "failed to log out cleanly");
                }
                self.end_chat();
                self.login = LoginState::default();
                self.register = RegisterState::default();
                self.screen = Screen::Login;
            }
        }
    }

    /// Drop everything the signed-in user typed or received, including a
    /// request still in flight
    fn end_chat(&mut self) {
        if let Some(task) = self.exchange_task.take() {
            task.abort();
        }
        self.controller = self.controller.fresh();
        self.input.clear();
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.follow_tail = true;
        self.animation_frame = 0;
    }

    fn enter_chat(&mut self, user: User) {
        info!(email = %user.email, "entering chat");
        self.login = LoginState::default();
        self.register = RegisterState::default();
        self.screen = Screen::Chat;
    }
}

async fn within<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::time::timeout(limit, request).await.unwrap_or_else(|_| {
        Err(AuthError::Network(
            "the sign-in service did not respond in time".to_string(),
        ))
    })
}

fn auth_message(err: AuthError) -> String {
    warn!(error = %err, "sign-in failed");
    err.to_string()
}
