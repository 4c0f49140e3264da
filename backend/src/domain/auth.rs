//! Authentication primitives such as login credentials and registration input.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::user::{EmailAddress, Role, User, UserId, UserProfile, UserValidationError, Username};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Validated login credentials used by authentication services.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use portal::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" alice ", "password").unwrap();
/// assert_eq!(creds.username(), "alice");
/// assert_eq!(creds.password(), "password");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username string suitable for user lookups.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Errors raised while validating a registration payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationValidationError {
    #[error(transparent)]
    Field(#[from] UserValidationError),
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Validated registration input: identity, password and profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    username: Username,
    email: EmailAddress,
    password: Zeroizing<String>,
    profile: UserProfile,
}

impl Registration {
    /// Assemble a registration from validated parts.
    pub fn new(
        username: Username,
        email: EmailAddress,
        password: &str,
        profile: UserProfile,
    ) -> Result<Self, RegistrationValidationError> {
        if password.is_empty() {
            return Err(RegistrationValidationError::EmptyPassword);
        }
        Ok(Self {
            username,
            email,
            password: Zeroizing::new(password.to_owned()),
            profile,
        })
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}

/// Identity returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub role: Role,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().clone(),
            email: user.email().clone(),
            role: user.role(),
        }
    }
}

/// Identity carried by a session: who is calling and with which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
