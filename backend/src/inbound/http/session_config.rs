//! Session cookie settings read from `SESSION_*` environment variables.
//!
//! Release builds require every toggle to be set explicitly. Debug builds
//! fall back to development defaults and log a warning for each one.

use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use mockable::Env;
use tracing::warn;
use zeroize::Zeroize;

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
/// Session lifetime when `SESSION_TTL_SECS` is unset.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";
const COOKIE_SECURE_ENV: &str = "SESSION_COOKIE_SECURE";
const SAMESITE_ENV: &str = "SESSION_SAMESITE";
const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
const TTL_ENV: &str = "SESSION_TTL_SECS";

const BOOL_EXPECTED: &str = "1|0|true|false|yes|no";
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";
const TTL_EXPECTED: &str = "a positive number of seconds";

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Missing or invalid toggles fall back to defaults with a warning.
    Debug,
    /// Missing or invalid toggles are errors.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portal::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Validated session cookie settings.
pub struct SessionSettings {
    /// Signing and encryption key for session cookies.
    pub key: Key,
    /// Whether session cookies are marked `Secure`.
    pub cookie_secure: bool,
    pub same_site: SameSite,
    /// Max-age of the session cookie and of server-side session state.
    pub ttl: Duration,
}

/// Errors raised while validating session configuration.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("SESSION_SAMESITE=None requires SESSION_COOKIE_SECURE=1")]
    InsecureSameSiteNone,
    #[error("SESSION_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
}

/// Applies the build-mode policy to individual variables.
struct EnvPolicy<'a, E> {
    env: &'a E,
    mode: BuildMode,
}

impl<E: Env> EnvPolicy<'_, E> {
    /// Parse `name` with `parse`; in debug builds absent or unparseable
    /// values become `fallback`.
    fn read<T>(
        &self,
        name: &'static str,
        expected: &'static str,
        fallback: T,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<T, SessionConfigError> {
        let Some(value) = self.env.string(name) else {
            return match self.mode {
                BuildMode::Debug => {
                    warn!(name, "session variable not set; using development default");
                    Ok(fallback)
                }
                BuildMode::Release => Err(SessionConfigError::MissingEnv { name }),
            };
        };
        match (parse(&value), self.mode) {
            (Some(parsed), _) => Ok(parsed),
            (None, BuildMode::Debug) => {
                warn!(name, %value, "invalid session variable; using development default");
                Ok(fallback)
            }
            (None, BuildMode::Release) => Err(SessionConfigError::InvalidEnv {
                name,
                value,
                expected,
            }),
        }
    }
}

/// Build session settings from environment variables and build mode.
///
/// `SESSION_TTL_SECS` is optional in every mode and defaults to two hours.
///
/// # Examples
///
/// ```rust
/// use portal::inbound::http::session_config::{BuildMode, session_settings_from_env};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("portal_session_key_example");
/// std::fs::write(&key_path, vec![b'k'; 64])?;
/// let key_path = key_path.to_string_lossy().into_owned();
///
/// let mut env = MockEnv::new();
/// let path = key_path.clone();
/// env.expect_string().returning(move |name| match name {
///     "SESSION_KEY_FILE" => Some(path.clone()),
///     "SESSION_COOKIE_SECURE" => Some("1".to_owned()),
///     "SESSION_SAMESITE" => Some("Strict".to_owned()),
///     "SESSION_ALLOW_EPHEMERAL" => Some("0".to_owned()),
///     "SESSION_TTL_SECS" => Some("600".to_owned()),
///     _ => None,
/// });
///
/// let settings = session_settings_from_env(&env, BuildMode::Release)?;
/// assert!(settings.cookie_secure);
/// assert_eq!(settings.ttl.as_secs(), 600);
///
/// std::fs::remove_file(&key_path)?;
/// # Ok(())
/// # }
/// ```
pub fn session_settings_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let policy = EnvPolicy { env, mode };
    let cookie_secure = policy.read(COOKIE_SECURE_ENV, BOOL_EXPECTED, true, parse_bool)?;
    let same_site = same_site(&policy, cookie_secure)?;
    let allow_ephemeral = policy.read(ALLOW_EPHEMERAL_ENV, BOOL_EXPECTED, false, parse_bool)?;
    if allow_ephemeral && mode == BuildMode::Release {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }
    let ttl = session_ttl(env)?;
    let key = session_key(env, mode, allow_ephemeral)?;

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
        ttl,
    })
}

fn same_site<E: Env>(
    policy: &EnvPolicy<'_, E>,
    cookie_secure: bool,
) -> Result<SameSite, SessionConfigError> {
    let fallback = match policy.mode {
        BuildMode::Debug => SameSite::Lax,
        BuildMode::Release => SameSite::Strict,
    };
    let same_site = policy.read(SAMESITE_ENV, SAMESITE_EXPECTED, fallback, parse_same_site)?;
    if same_site == SameSite::None && !cookie_secure {
        match policy.mode {
            BuildMode::Debug => {
                warn!("SESSION_SAMESITE=None without a secure cookie; browsers may drop it");
            }
            BuildMode::Release => return Err(SessionConfigError::InsecureSameSiteNone),
        }
    }
    Ok(same_site)
}

fn session_ttl<E: Env>(env: &E) -> Result<Duration, SessionConfigError> {
    let Some(value) = env.string(TTL_ENV) else {
        return Ok(DEFAULT_SESSION_TTL);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SessionConfigError::InvalidEnv {
            name: TTL_ENV,
            value,
            expected: TTL_EXPECTED,
        }),
    }
}

fn session_key<E: Env>(
    env: &E,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SessionConfigError> {
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SESSION_KEY_DEFAULT_PATH.to_owned()),
    );

    let mut bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(source) if mode == BuildMode::Debug || allow_ephemeral => {
            warn!(
                path = %path.display(),
                error = %source,
                "using temporary session key (dev only)"
            );
            return Ok(Key::generate());
        }
        Err(source) => return Err(SessionConfigError::KeyRead { path, source }),
    };
    let length = bytes.len();
    let result = if length < SESSION_KEY_MIN_LEN {
        // Key::derive_from needs at least 32 bytes; release builds insist
        // on the full 64.
        if mode == BuildMode::Release || length < 32 {
            Err(SessionConfigError::KeyTooShort {
                path,
                length,
                min_len: SESSION_KEY_MIN_LEN,
            })
        } else {
            Ok(Key::derive_from(&bytes))
        }
    } else {
        Ok(Key::derive_from(&bytes))
    };
    bytes.zeroize();
    result
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.trim().to_ascii_lowercase().as_str() {
        "lax" => Some(SameSite::Lax),
        "strict" => Some(SameSite::Strict),
        "none" => Some(SameSite::None),
        _ => None,
    }
}
