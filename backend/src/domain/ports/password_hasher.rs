//! Port for salted password hashing.

use crate::domain::PasswordDigest;

use super::define_port_error;

define_port_error! {
    /// Errors raised while hashing a password.
    pub enum PasswordHashError {
        /// The hashing backend rejected the input or its parameters.
        Hashing { message: String } => "password hashing failed: {message}",
    }
}

/// Hashes passwords for storage and verifies login attempts against them.
///
/// Verification never compares plaintext; an unparseable digest verifies as
/// `false`.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Produce a salted digest for `plain`.
    fn hash(&self, plain: &str) -> Result<PasswordDigest, PasswordHashError>;

    /// Check `plain` against a stored digest.
    fn verify(&self, plain: &str, digest: &PasswordDigest) -> bool;
}
