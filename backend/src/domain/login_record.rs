//! Last-login metadata kept per account.
//!
//! The record is upserted on each successful login and survives logout; it is
//! an audit trail, not a revocable session.

use std::net::{IpAddr, SocketAddr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Login metadata for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    pub user_id: UserId,
    pub login_at: DateTime<Utc>,
    pub login_ip: Option<IpAddr>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Parse a peer address as reported by the transport.
///
/// Accepts bare addresses and `address:port` forms; anything else yields
/// `None`.
///
/// # Examples
/// ```
/// use portal::domain::parse_peer_ip;
///
/// assert_eq!(parse_peer_ip("203.0.113.9:5123").unwrap().to_string(), "203.0.113.9");
/// assert_eq!(parse_peer_ip("::1").unwrap().to_string(), "::1");
/// assert!(parse_peer_ip("unknown").is_none());
/// ```
pub fn parse_peer_ip(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim();
    trimmed
        .parse::<IpAddr>()
        .ok()
        .or_else(|| trimmed.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
