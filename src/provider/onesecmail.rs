//! 1secmail adapter
//!
//! Stateless: a mailbox is just a login and a domain, and the same
//! pair is enough to list and read messages. No registration call is
//! needed.

use super::{MailProvider, ProviderKind, collection, object_or_none};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Request};
use crate::model::{MailboxIdentity, ProviderHandle, generate_login};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Domains served when the upstream domain list is unreachable.
pub const FALLBACK_DOMAINS: [&str; 3] =
    ["1secmail.com", "1secmail.org", "1secmail.net"];

/// Domain of locally synthesized mailboxes.
pub const SYNTHETIC_DOMAIN: &str = FALLBACK_DOMAINS[0];

const DOMAIN_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct State {
    handle: ProviderHandle,
    domains_fetched_at: Option<Instant>,
}

pub struct OneSecMailProvider {
    http: HttpClient,
    base_url: String,
    state: Mutex<State>,
}

impl OneSecMailProvider {
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            state: Mutex::new(State {
                handle: ProviderHandle::new(ProviderKind::OneSecMail.as_str()),
                domains_fetched_at: None,
            }),
        }
    }

    fn action(&self, action: &str) -> Request {
        Request::get(&self.base_url).query("action", action)
    }

    fn mailbox_action(
        &self,
        action: &str,
        mailbox: &MailboxIdentity,
    ) -> Request {
        self.action(action)
            .query("login", mailbox.login.as_str())
            .query("domain", mailbox.domain.as_str())
    }

    async fn fetch_domains(&self) -> Result<Vec<String>> {
        let value = self.http.send(&self.action("getDomainList")).await?;
        let domains: Vec<String> = collection(value)
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        let mut state = self.lock();
        state.handle.cached_domain_list.clone_from(&domains);
        state.domains_fetched_at = Some(Instant::now());
        Ok(domains)
    }

    fn fresh_domains(&self) -> Option<Vec<String>> {
        let state = self.lock();
        let fetched_at = state.domains_fetched_at?;
        let cached = &state.handle.cached_domain_list;
        (fetched_at.elapsed() < DOMAIN_TTL && !cached.is_empty())
            .then(|| cached.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl MailProvider for OneSecMailProvider {
    fn name(&self) -> &str {
        ProviderKind::OneSecMail.as_str()
    }

    fn handle(&self) -> ProviderHandle {
        self.lock().handle.clone()
    }

    async fn check_health(&self) -> bool {
        let healthy = match self.fetch_domains().await {
            Ok(domains) => !domains.is_empty(),
            Err(e) => {
                warn!("1secmail health check failed: {}", e);
                false
            }
        };
        self.lock().handle.record_health(healthy);
        healthy
    }

    /// Cached for 60 seconds; falls back to [`FALLBACK_DOMAINS`] when
    /// the upstream call fails. An empty upstream list is passed through
    /// so that creation can report it.
    async fn list_domains(&self) -> Result<Vec<String>> {
        if let Some(domains) = self.fresh_domains() {
            debug!("Serving cached 1secmail domain list");
            return Ok(domains);
        }

        match self.fetch_domains().await {
            Ok(domains) => Ok(domains),
            Err(e) => {
                warn!(
                    "1secmail domain list unavailable, using fallback: {}",
                    e
                );
                Ok(FALLBACK_DOMAINS.map(str::to_string).to_vec())
            }
        }
    }

    async fn create_mailbox(&self) -> Result<MailboxIdentity> {
        let domains = self.list_domains().await?;
        let domain = domains
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| Error::provider("1secmail offered no domains"))?;

        let mailbox = MailboxIdentity::new(
            generate_login(),
            domain.as_str(),
            self.name(),
        );
        info!("Created 1secmail mailbox {}", mailbox.address);
        Ok(mailbox)
    }

    async fn list_messages(
        &self,
        mailbox: &MailboxIdentity,
    ) -> Result<Vec<Value>> {
        let value = self
            .http
            .send(&self.mailbox_action("getMessages", mailbox))
            .await?;
        Ok(collection(value))
    }

    async fn fetch_message(
        &self,
        mailbox: &MailboxIdentity,
        id: &str,
    ) -> Result<Option<Value>> {
        let request =
            self.mailbox_action("readMessage", mailbox).query("id", id);
        Ok(object_or_none(self.http.send(&request).await?))
    }
}
