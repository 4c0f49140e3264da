//! Argon2id implementation of the `PasswordHasher` port.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use tracing::warn;

use crate::domain::PasswordDigest;
use crate::domain::ports::{PasswordHashError, PasswordHasher};

/// Hashes with Argon2id default parameters and a random salt per password.
#[derive(Debug, Default, Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plain: &str) -> Result<PasswordDigest, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| PasswordDigest::new(hash.to_string()))
            .map_err(|err| PasswordHashError::hashing(err.to_string()))
    }

    fn verify(&self, plain: &str, digest: &PasswordDigest) -> bool {
        match PasswordHash::new(digest.as_str()) {
            Ok(parsed) => self
                .argon2
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                warn!(error = %err, "stored password digest is not a PHC string");
                false
            }
        }
    }
}
