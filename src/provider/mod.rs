//! Mailbox provider adapters
//!
//! Each upstream service is wrapped behind [`MailProvider`]. Adapters
//! own their own session state and health bookkeeping; callers only see
//! the capability surface and provider-native JSON records.

mod guerrilla;
mod mailtm;
mod onesecmail;

pub use guerrilla::GuerrillaProvider;
pub use mailtm::MailTmProvider;
pub use onesecmail::{FALLBACK_DOMAINS, OneSecMailProvider, SYNTHETIC_DOMAIN};

use crate::error::{Error, Result};
use crate::model::{MailboxIdentity, ProviderHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The supported upstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OneSecMail,
    MailTm,
    Guerrilla,
}

impl ProviderKind {
    /// Order in which providers are probed and tried.
    pub const PRIORITY: [Self; 3] =
        [Self::OneSecMail, Self::MailTm, Self::Guerrilla];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneSecMail => "1secmail",
            Self::MailTm => "mail.tm",
            Self::Guerrilla => "guerrillamail",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("Unknown provider: {s}")))
    }
}

/// Capability surface every adapter implements.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Display name, also recorded on issued mailboxes.
    fn name(&self) -> &str;

    /// Snapshot of health and domain state.
    fn handle(&self) -> ProviderHandle;

    /// Probe the upstream. Never fails; unreachable means unhealthy.
    async fn check_health(&self) -> bool;

    /// Domains new mailboxes may be created under.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the upstream cannot be reached
    /// and the adapter has no fallback.
    async fn list_domains(&self) -> Result<Vec<String>>;

    /// Register a new mailbox and remember whatever session it needs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` when the upstream refuses, or the
    /// transport error that ended the attempt.
    async fn create_mailbox(&self) -> Result<MailboxIdentity>;

    /// Raw message records for `mailbox`. Empty when the adapter has
    /// no session yet.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    async fn list_messages(
        &self,
        mailbox: &MailboxIdentity,
    ) -> Result<Vec<Value>>;

    /// Raw record for one message, `None` if the upstream has nothing.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    async fn fetch_message(
        &self,
        mailbox: &MailboxIdentity,
        id: &str,
    ) -> Result<Option<Value>>;
}

/// Elements of a JSON array, or of a JSON-LD `hydra:member` collection.
pub(crate) fn collection(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("hydra:member") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `Some` only for JSON objects; upstreams signal "no such message" with
/// `null`, `false`, or a bare string.
pub(crate) fn object_or_none(value: Value) -> Option<Value> {
    value.is_object().then_some(value)
}
