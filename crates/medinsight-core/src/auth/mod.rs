pub mod firebase;
pub mod form;

pub use firebase::FirebaseAuth;
pub use form::{LoginForm, PasswordStrength, RegisterForm};
