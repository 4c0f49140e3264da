//! Approval records gating whether a registered account may log in.
//!
//! Every status-changing write is guarded by [`ApprovalVersion`]: a write is
//! accepted only when the caller's expected version equals the stored one, and
//! each accepted write advances the version by exactly one.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::{EmailAddress, Role, UserId, UserProfile, Username};

/// Lifecycle state of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ApprovalStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "re-registered")]
    ReRegistered,
}

impl ApprovalStatus {
    /// Stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ReRegistered => "re-registered",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored approval status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown approval status: {0}")]
pub struct UnknownApprovalStatus(pub String);

impl FromStr for ApprovalStatus {
    type Err = UnknownApprovalStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "re-registered" => Ok(Self::ReRegistered),
            other => Err(UnknownApprovalStatus(other.to_owned())),
        }
    }
}

/// Optimistic concurrency token for approval writes.
///
/// # Examples
/// ```
/// use portal::domain::ApprovalVersion;
///
/// let v1 = ApprovalVersion::initial();
/// assert_eq!(v1.get(), 1);
/// assert_eq!(v1.next().get(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalVersion(i32);

/// Raised when a version below one is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("approval version must be at least 1, got {0}")]
pub struct InvalidApprovalVersion(pub i32);

impl ApprovalVersion {
    /// Version assigned to freshly created approvals.
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Validate a caller- or store-supplied version.
    pub fn new(value: i32) -> Result<Self, InvalidApprovalVersion> {
        if value < 1 {
            return Err(InvalidApprovalVersion(value));
        }
        Ok(Self(value))
    }

    /// The version a successful write produces.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ApprovalVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Longest rejection reason the approval record stores.
pub const REJECTION_REASON_MAX: usize = 255;

/// Raised when a rejection reason exceeds [`REJECTION_REASON_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rejection reason must be at most {max} characters")]
pub struct RejectionReasonTooLong {
    pub max: usize,
}

/// Trimmed, non-empty explanation attached to a rejection.
///
/// # Examples
/// ```
/// use portal::domain::RejectionReason;
///
/// let reason = RejectionReason::parse("  incomplete profile ").expect("valid");
/// assert_eq!(reason.as_ref().map(AsRef::as_ref), Some("incomplete profile"));
/// assert_eq!(RejectionReason::parse("   "), Ok(None));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason(String);

impl RejectionReason {
    /// Parse an administrator comment; blank comments carry no reason.
    pub fn parse(raw: &str) -> Result<Option<Self>, RejectionReasonTooLong> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > REJECTION_REASON_MAX {
            return Err(RejectionReasonTooLong {
                max: REJECTION_REASON_MAX,
            });
        }
        Ok(Some(Self(trimmed.to_owned())))
    }
}

impl AsRef<str> for RejectionReason {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RejectionReason> for String {
    fn from(value: RejectionReason) -> Self {
        value.0
    }
}

/// Stored approval record, one per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: UserId,
    #[schema(value_type = String, example = "alice")]
    pub username: Username,
    pub status: ApprovalStatus,
    pub reviewer: Option<String>,
    #[schema(value_type = i32, example = 1)]
    pub version: ApprovalVersion,
    pub rejection_reason: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Conditional write applied to an approval.
///
/// Adapters apply it as one `UPDATE ... WHERE version = expected_version`
/// statement that also advances the version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalTransition {
    pub user_id: UserId,
    pub expected_version: ApprovalVersion,
    pub status: ApprovalStatus,
    pub reviewer: Option<String>,
    pub rejection_reason: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ApprovalTransition {
    /// Approve the account, recording the reviewer.
    pub fn approve(
        user_id: UserId,
        expected_version: ApprovalVersion,
        reviewer: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            expected_version,
            status: ApprovalStatus::Approved,
            reviewer: Some(reviewer.into()),
            rejection_reason: None,
            processed_at,
        }
    }

    /// Reject the account with an optional reason, recording the reviewer.
    pub fn reject(
        user_id: UserId,
        expected_version: ApprovalVersion,
        reviewer: impl Into<String>,
        reason: Option<RejectionReason>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            expected_version,
            status: ApprovalStatus::Rejected,
            reviewer: Some(reviewer.into()),
            rejection_reason: reason.map(String::from),
            processed_at,
        }
    }
}

/// Approval joined with the account fields an administrator reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalListing {
    #[serde(flatten)]
    pub approval: Approval,
    #[schema(value_type = String, example = "alice@example.org")]
    pub email: EmailAddress,
    pub role: Role,
    #[serde(flatten)]
    pub profile: UserProfile,
}
