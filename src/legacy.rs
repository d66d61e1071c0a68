//! Compatibility facade with the older call shape
//!
//! Every call delegates to an owned [`Orchestrator`]. The only state
//! kept here is a copy of the last seen address parts, readable without
//! awaiting.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::model::{MessageDetail, MessageSummary};
use crate::orchestrator::Orchestrator;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Default)]
struct LastSeen {
    address: Option<String>,
    login: Option<String>,
    domain: Option<String>,
}

pub struct LegacyMailbox {
    inner: Arc<Orchestrator>,
    last_seen: Mutex<LastSeen>,
}

impl LegacyMailbox {
    /// Facade over a fresh [`Orchestrator`] built from `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::wrap(Orchestrator::new(config)?))
    }

    #[must_use]
    pub fn wrap(inner: Orchestrator) -> Self {
        Self {
            inner: Arc::new(inner),
            last_seen: Mutex::new(LastSeen::default()),
        }
    }

    /// The orchestrator behind this facade.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.inner
    }

    /// Select a provider. Returns its name.
    pub async fn init(&self) -> String {
        self.inner.initialize().await
    }

    pub async fn generate_email(&self) -> String {
        let address = self.inner.create_mailbox().await;
        self.remember();
        address
    }

    pub async fn refresh_email(&self) -> String {
        let address = self.inner.refresh_mailbox().await;
        self.remember();
        address
    }

    /// Current inbox; stale or empty when the provider is unreachable.
    pub async fn get_messages(&self) -> Vec<MessageSummary> {
        self.inner
            .list_messages()
            .await
            .into_value()
            .map(|summaries| summaries.to_vec())
            .unwrap_or_default()
    }

    pub async fn read_message(&self, id: &str) -> Option<MessageDetail> {
        self.inner.get_message(id).await.into_value()
    }

    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.last_seen().address
    }

    #[must_use]
    pub fn login(&self) -> Option<String> {
        self.last_seen().login
    }

    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.last_seen().domain
    }

    #[must_use]
    pub fn provider(&self) -> String {
        self.inner.active_provider_name()
    }

    fn remember(&self) {
        let seen = self
            .inner
            .active_identity()
            .map(|m| LastSeen {
                address: Some(m.address),
                login: Some(m.login),
                domain: Some(m.domain),
            })
            .unwrap_or_default();
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = seen;
    }

    fn last_seen(&self) -> LastSeen {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
