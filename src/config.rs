//! Client configuration

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_ONESECMAIL_URL: &str = "https://www.1secmail.com/api/v1/";
pub const DEFAULT_MAILTM_URL: &str = "https://api.mail.tm";
pub const DEFAULT_GUERRILLA_URL: &str =
    "https://api.guerrillamail.com/ajax.php";

/// Base URLs of the three upstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUrls {
    pub one_sec_mail: String,
    pub mail_tm: String,
    pub guerrilla: String,
}

impl Default for ProviderUrls {
    fn default() -> Self {
        Self {
            one_sec_mail: DEFAULT_ONESECMAIL_URL.to_string(),
            mail_tm: DEFAULT_MAILTM_URL.to_string(),
            guerrilla: DEFAULT_GUERRILLA_URL.to_string(),
        }
    }
}

/// Retry behaviour of the HTTP layer.
///
/// The delay before retry `n` (1-indexed) is
/// `base_delay * multiplier^(n - 1)`, without jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
            timeout: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry that follows failed attempt `attempt`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Everything needed to build an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub providers: ProviderUrls,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `TEMPMAIL_ONESECMAIL_URL`, `TEMPMAIL_MAILTM_URL`,
    ///   `TEMPMAIL_GUERRILLA_URL` (default: the public services)
    /// - `TEMPMAIL_TIMEOUT_MS` (default: `10000`)
    /// - `TEMPMAIL_MAX_ATTEMPTS` (default: `3`)
    /// - `TEMPMAIL_RETRY_BASE_MS` (default: `1000`)
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a numeric variable does not parse or
    /// the attempt count is zero.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let urls = ProviderUrls {
            one_sec_mail: lookup("TEMPMAIL_ONESECMAIL_URL")
                .unwrap_or(defaults.providers.one_sec_mail),
            mail_tm: lookup("TEMPMAIL_MAILTM_URL")
                .unwrap_or(defaults.providers.mail_tm),
            guerrilla: lookup("TEMPMAIL_GUERRILLA_URL")
                .unwrap_or(defaults.providers.guerrilla),
        };

        let max_attempts = parse_number(&lookup, "TEMPMAIL_MAX_ATTEMPTS")?
            .map_or(Ok(defaults.retry.max_attempts), |n| {
                u32::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        Error::Config(
                            "TEMPMAIL_MAX_ATTEMPTS must be at least 1".into(),
                        )
                    })
            })?;

        let retry = RetryPolicy {
            max_attempts,
            base_delay: parse_number(&lookup, "TEMPMAIL_RETRY_BASE_MS")?
                .map_or(defaults.retry.base_delay, Duration::from_millis),
            timeout: parse_number(&lookup, "TEMPMAIL_TIMEOUT_MS")?
                .map_or(defaults.retry.timeout, Duration::from_millis),
            ..defaults.retry
        };

        Ok(Self {
            providers: urls,
            retry,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}
