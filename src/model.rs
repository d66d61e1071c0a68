//! Canonical data types shared by adapters and the orchestrator

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Length of generated mailbox logins.
pub const LOGIN_LENGTH: usize = 10;

/// Subject used when a message carries none.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Provider-issued secret kept alongside a mailbox.
///
/// Only the adapter that issued it looks inside; everyone else passes
/// it through untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret. Meant for the issuing adapter only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A disposable address registered with (or synthesized for) a
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxIdentity {
    pub login: String,
    pub domain: String,
    pub address: String,
    /// Name of the provider that issued this mailbox.
    pub provider: String,
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl MailboxIdentity {
    #[must_use]
    pub fn new(
        login: impl Into<String>,
        domain: impl Into<String>,
        provider: &str,
    ) -> Self {
        let login = login.into();
        let domain = domain.into();
        Self {
            address: format!("{login}@{domain}"),
            login,
            domain,
            provider: provider.to_string(),
            credential: None,
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Split a full address into an identity.
    #[must_use]
    pub fn from_address(address: &str, provider: &str) -> Option<Self> {
        let (login, domain) = address.split_once('@')?;
        Some(Self::new(login, domain, provider))
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid_address(&self.address)
    }
}

/// Basic email-shape check: `local@domain.tld`, no whitespace.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || domain.contains('@')
        || address.chars().any(char::is_whitespace)
    {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.')
}

/// Random login whose first character is always a lowercase letter.
#[must_use]
pub fn generate_login() -> String {
    let mut rng = rand::thread_rng();
    let first = char::from(rng.gen_range(b'a'..=b'z'));
    let rest = (&mut rng)
        .sample_iter(Alphanumeric)
        .take(LOGIN_LENGTH - 1)
        .map(|b| char::from(b).to_ascii_lowercase());
    std::iter::once(first).chain(rest).collect()
}

/// Random alphanumeric secret of the given length.
#[must_use]
pub fn generate_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Health and domain state of one adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderHandle {
    pub name: String,
    pub healthy: bool,
    pub last_health_check_at: Option<DateTime<Utc>>,
    pub cached_domain_list: Vec<String>,
}

impl ProviderHandle {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn record_health(&mut self, healthy: bool) {
        self.healthy = healthy;
        self.last_health_check_at = Some(Utc::now());
    }
}

/// List-view shape of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub id: String,
    pub from: Option<String>,
    pub subject: String,
    pub received_at: Option<DateTime<Utc>>,
    pub preview: String,
}

/// Full shape of a single message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDetail {
    pub id: String,
    pub from: Option<String>,
    pub subject: String,
    pub received_at: Option<DateTime<Utc>>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub attachments: Vec<Value>,
}

impl MessageDetail {
    /// Plain text if present, otherwise the HTML body.
    #[must_use]
    pub fn best_body(&self) -> &str {
        self.body_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.body_html.as_deref())
            .unwrap_or_default()
    }
}

/// Snapshot of the orchestrator's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub mailboxes_created: u64,
    pub messages_fetched: u64,
    pub provider_switches: u64,
}
