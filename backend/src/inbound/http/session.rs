//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The session stores the caller's user id and role, captured at login. A
//! promotion therefore takes effect from the caller's next login.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, Principal, Role, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Start a fresh session for the authenticated principal.
    ///
    /// The session key is renewed so an identifier issued before login
    /// cannot be reused afterwards.
    pub fn persist_principal(&self, principal: &Principal) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, principal.user_id.to_string())
            .and_then(|()| self.0.insert(ROLE_KEY, principal.role.as_str()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the current principal from the session, if present.
    ///
    /// Unreadable or tampered entries are treated as an anonymous caller.
    pub fn principal(&self) -> Result<Option<Principal>, Error> {
        let read = |key: &str| {
            self.0
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_id), Some(raw_role)) = (read(USER_ID_KEY)?, read(ROLE_KEY)?) else {
            return Ok(None);
        };
        let user_id = match UserId::new(raw_id) {
            Ok(id) => id,
            Err(error) => {
                warn!(%error, "invalid user id in session");
                return Ok(None);
            }
        };
        match raw_role.parse::<Role>() {
            Ok(role) => Ok(Some(Principal { user_id, role })),
            Err(error) => {
                warn!(%error, "invalid role in session");
                Ok(None)
            }
        }
    }

    /// Require an authenticated caller or return `401 Unauthorized`.
    pub fn require_user(&self) -> Result<Principal, Error> {
        self.principal()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Require an administrator; anonymous callers get `401`, others `403`.
    pub fn require_admin(&self) -> Result<Principal, Error> {
        let principal = self.require_user()?;
        if principal.is_admin() {
            Ok(principal)
        } else {
            Err(Error::forbidden("administrator role required"))
        }
    }

    /// Drop all session state.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
