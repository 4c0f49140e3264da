//! Shared builders for domain service tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{
    AccountStatus, Approval, ApprovalStatus, ApprovalVersion, EmailAddress, Registration, Role,
    User, UserId, UserProfile, Username,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn profile() -> UserProfile {
    UserProfile::try_from_parts("Alice", "Liddell", Some("UK"), Some("Oxford"), None)
        .expect("valid profile")
}

pub(crate) fn registration(username: &str, email: &str) -> Registration {
    Registration::new(
        Username::new(username).expect("valid username"),
        EmailAddress::new(email).expect("valid email"),
        "wonderland",
        profile(),
    )
    .expect("valid registration")
}

pub(crate) fn user(id: UserId, username: &str, email: &str, role: Role) -> User {
    User::new(
        id,
        Username::new(username).expect("valid username"),
        EmailAddress::new(email).expect("valid email"),
        role,
        AccountStatus::Active,
        profile(),
    )
}

pub(crate) fn approval(
    user_id: UserId,
    username: &str,
    status: ApprovalStatus,
    version: i32,
) -> Approval {
    Approval {
        user_id,
        username: Username::new(username).expect("valid username"),
        status,
        reviewer: None,
        version: ApprovalVersion::new(version).expect("valid version"),
        rejection_reason: None,
        registered_at: fixture_timestamp(),
        processed_at: fixture_timestamp(),
    }
}
