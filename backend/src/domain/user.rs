//! User account model.
//!
//! Accounts are created by registration and carry a unique username, a unique
//! email address (compared case-insensitively), a role and an account status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum length accepted for usernames.
pub const USERNAME_MAX: usize = 64;
/// Maximum length accepted for email addresses.
pub const EMAIL_MAX: usize = 254;
/// Maximum length accepted for profile text fields.
pub const PROFILE_FIELD_MAX: usize = 255;

/// Validation errors returned by the account value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("user id must be a valid UUID")]
    InvalidId,
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username must be at most {max} characters")]
    UsernameTooLong { max: usize },
    #[error("username must not contain whitespace or control characters")]
    UsernameInvalidCharacters,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must look like local@domain")]
    MalformedEmail,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("{field} must not be empty")]
    EmptyProfileField { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    ProfileFieldTooLong { field: &'static str, max: usize },
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown account status: {0}")]
    UnknownStatus(String),
}

/// Stable user identifier stored as a UUID.
///
/// # Examples
/// ```
/// use portal::domain::UserId;
///
/// let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
/// assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.trim() != raw {
            return Err(UserValidationError::InvalidId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Login name, trimmed and matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    ///
    /// # Examples
    /// ```
    /// use portal::domain::Username;
    ///
    /// let name = Username::new("  alice ").unwrap();
    /// assert_eq!(name.as_ref(), "alice");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if trimmed.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Email address normalised to trimmed lower case.
///
/// Normalisation makes equality case-insensitive, which is the uniqueness rule
/// the credential store enforces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and construct an [`EmailAddress`].
    ///
    /// # Examples
    /// ```
    /// use portal::domain::EmailAddress;
    ///
    /// let email = EmailAddress::new(" Alice@X.com ").unwrap();
    /// assert_eq!(email.as_ref(), "alice@x.com");
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if normalised.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(UserValidationError::MalformedEmail);
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || normalised.chars().any(char::is_whitespace)
        {
            return Err(UserValidationError::MalformedEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Authorisation role attached to an account and its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UserValidationError::UnknownRole(other.to_owned())),
        }
    }
}

/// Whether the account may be used at all, independent of approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Disabled,
}

impl AccountStatus {
    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            other => Err(UserValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

fn required_field(field: &'static str, raw: &str) -> Result<String, UserValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyProfileField { field });
    }
    bounded_field(field, trimmed)
}

fn optional_field(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<String>, UserValidationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => bounded_field(field, value).map(Some),
        None => Ok(None),
    }
}

fn bounded_field(field: &'static str, value: &str) -> Result<String, UserValidationError> {
    if value.chars().count() > PROFILE_FIELD_MAX {
        return Err(UserValidationError::ProfileFieldTooLong {
            field,
            max: PROFILE_FIELD_MAX,
        });
    }
    Ok(value.to_owned())
}

/// Mutable profile details captured at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    research: Option<String>,
}

impl UserProfile {
    /// Validate and construct a profile. Names are required; the rest are
    /// optional and blank values collapse to `None`.
    pub fn try_from_parts(
        first_name: &str,
        last_name: &str,
        country: Option<&str>,
        affiliation: Option<&str>,
        research: Option<&str>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self {
            first_name: required_field("first name", first_name)?,
            last_name: required_field("last name", last_name)?,
            country: optional_field("country", country)?,
            affiliation: optional_field("affiliation", affiliation)?,
            research: optional_field("research", research)?,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn affiliation(&self) -> Option<&str> {
        self.affiliation.as_deref()
    }

    pub fn research(&self) -> Option<&str> {
        self.research.as_deref()
    }
}

/// Stored password hash in PHC string format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap an encoded hash produced by a [`crate::domain::ports::PasswordHasher`].
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

/// Registered account.
///
/// ## Invariants
/// - `username` and `email` are unique across accounts.
/// - Every account has exactly one approval record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Username,
    email: EmailAddress,
    role: Role,
    status: AccountStatus,
    profile: UserProfile,
}

impl User {
    /// Assemble an account from validated parts.
    pub fn new(
        id: UserId,
        username: Username,
        email: EmailAddress,
        role: Role,
        status: AccountStatus,
        profile: UserProfile,
    ) -> Self {
        Self {
            id,
            username,
            email,
            role,
            status,
            profile,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}

/// Account together with its stored credential, as read by login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub user: User,
    pub password: PasswordDigest,
}
