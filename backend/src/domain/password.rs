//! Async wrappers running password hashing off the request executor.

use std::sync::Arc;

use tracing::error;
use zeroize::Zeroizing;

use super::ports::PasswordHasher;
use super::{Error, PasswordDigest};

/// Hash `plain` on the blocking pool.
pub(crate) async fn hash_password(
    hasher: Arc<dyn PasswordHasher>,
    plain: &str,
) -> Result<PasswordDigest, Error> {
    let plain = Zeroizing::new(plain.to_owned());
    tokio::task::spawn_blocking(move || hasher.hash(&plain))
        .await
        .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
        .map_err(|err| {
            error!(error = %err, "password hashing failed");
            Error::internal(err.to_string())
        })
}

/// Verify `plain` against `digest` on the blocking pool.
pub(crate) async fn verify_password(
    hasher: Arc<dyn PasswordHasher>,
    plain: &str,
    digest: PasswordDigest,
) -> Result<bool, Error> {
    let plain = Zeroizing::new(plain.to_owned());
    tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest))
        .await
        .map_err(|err| Error::internal(format!("password verification task failed: {err}")))
}
