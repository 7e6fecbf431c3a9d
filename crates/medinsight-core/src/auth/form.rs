//! Client-side checks run before a sign-in request leaves the machine

use crate::session::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Missing fields first, then mismatch, then length
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.display_name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(AuthError::MissingFields);
        }
        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    /// `None` for an empty password
    pub fn of(password: &str) -> Option<Self> {
        match password.chars().count() {
            0 => None,
            1..=2 => Some(PasswordStrength::Weak),
            3..=5 => Some(PasswordStrength::Medium),
            _ => Some(PasswordStrength::Strong),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "Weak",
            PasswordStrength::Medium => "Medium",
            PasswordStrength::Strong => "Strong",
        }
    }

    /// Filled fraction of the strength meter, in thirds
    pub fn thirds(&self) -> u16 {
        match self {
            PasswordStrength::Weak => 1,
            PasswordStrength::Medium => 2,
            PasswordStrength::Strong => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, pw: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            display_name: name.to_string(),
            email: email.to_string(),
            password: pw.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let form = LoginForm { email: "a@b.c".to_string(), password: String::new() };
        assert_eq!(form.validate(), Err(AuthError::MissingFields));

        let form = LoginForm { email: "a@b.c".to_string(), password: "x".to_string() };
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_register_check_order() {
        // mismatch is reported before length
        assert_eq!(
            register("Ana", "a@b.c", "123", "456").validate(),
            Err(AuthError::PasswordMismatch)
        );
        assert_eq!(
            register("Ana", "a@b.c", "123", "123").validate(),
            Err(AuthError::WeakPassword)
        );
        assert_eq!(
            register("", "a@b.c", "123", "456").validate(),
            Err(AuthError::MissingFields)
        );
        assert_eq!(register("Ana", "a@b.c", "secret", "secret").validate(), Ok(()));
    }

    #[test]
    fn test_password_strength_buckets() {
        assert_eq!(PasswordStrength::of(""), None);
        assert_eq!(PasswordStrength::of("ab"), Some(PasswordStrength::Weak));
        assert_eq!(PasswordStrength::of("abc"), Some(PasswordStrength::Medium));
        assert_eq!(PasswordStrength::of("abcde"), Some(PasswordStrength::Medium));
        assert_eq!(PasswordStrength::of("abcdef"), Some(PasswordStrength::Strong));
    }
}
