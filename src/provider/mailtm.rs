//! mail.tm adapter
//!
//! Creating a mailbox is a two step transaction: register an account,
//! then exchange its credentials for a bearer token. The token is kept
//! here and attached to every later list and fetch call.

use super::{MailProvider, ProviderKind, collection, object_or_none};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Request};
use crate::model::{
    Credential, MailboxIdentity, ProviderHandle, generate_login,
    generate_secret,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Mutex;
use tracing::{debug, info, warn};

const PASSWORD_LENGTH: usize = 12;

#[derive(Debug, Deserialize)]
struct DomainRecord {
    domain: String,
    #[serde(rename = "isActive", default = "default_active")]
    is_active: bool,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Default)]
struct State {
    handle: ProviderHandle,
    token: Option<Credential>,
}

pub struct MailTmProvider {
    http: HttpClient,
    base_url: String,
    state: Mutex<State>,
}

impl MailTmProvider {
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(State {
                handle: ProviderHandle::new(ProviderKind::MailTm.as_str()),
                token: None,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Option<Credential> {
        self.lock().token.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl MailProvider for MailTmProvider {
    fn name(&self) -> &str {
        ProviderKind::MailTm.as_str()
    }

    fn handle(&self) -> ProviderHandle {
        self.lock().handle.clone()
    }

    async fn check_health(&self) -> bool {
        let healthy = match self.list_domains().await {
            Ok(domains) => !domains.is_empty(),
            Err(e) => {
                warn!("mail.tm health check failed: {}", e);
                false
            }
        };
        self.lock().handle.record_health(healthy);
        healthy
    }

    async fn list_domains(&self) -> Result<Vec<String>> {
        let value = self
            .http
            .send(&Request::get(self.endpoint("/domains")))
            .await?;
        let domains: Vec<String> = collection(value)
            .into_iter()
            .filter_map(|v| serde_json::from_value::<DomainRecord>(v).ok())
            .filter(|d| d.is_active)
            .map(|d| d.domain)
            .collect();

        self.lock().handle.cached_domain_list.clone_from(&domains);
        Ok(domains)
    }

    async fn create_mailbox(&self) -> Result<MailboxIdentity> {
        let domains = self.list_domains().await?;
        let domain = domains
            .first()
            .ok_or_else(|| Error::provider("mail.tm offered no domains"))?;

        let mut mailbox = MailboxIdentity::new(
            generate_login(),
            domain.as_str(),
            self.name(),
        );
        let credentials = json!({
            "address": mailbox.address,
            "password": generate_secret(PASSWORD_LENGTH),
        });

        let account = self
            .http
            .send(&Request::post(
                self.endpoint("/accounts"),
                credentials.clone(),
            ))
            .await?;
        if account.get("id").is_none() {
            return Err(Error::provider(
                "mail.tm rejected account registration",
            ));
        }
        debug!("Registered mail.tm account {}", mailbox.address);

        let token: TokenResponse = serde_json::from_value(
            self.http
                .send(&Request::post(self.endpoint("/token"), credentials))
                .await?,
        )
        .map_err(|e| Error::provider(format!("mail.tm token response: {e}")))?;

        let credential = Credential::new(token.token);
        self.lock().token = Some(credential.clone());
        mailbox = mailbox.with_credential(credential);

        info!("Created mail.tm mailbox {}", mailbox.address);
        Ok(mailbox)
    }

    async fn list_messages(
        &self,
        _mailbox: &MailboxIdentity,
    ) -> Result<Vec<Value>> {
        let Some(token) = self.token() else {
            return Ok(Vec::new());
        };
        let request =
            Request::get(self.endpoint("/messages")).bearer(token.expose());
        Ok(collection(self.http.send(&request).await?))
    }

    async fn fetch_message(
        &self,
        _mailbox: &MailboxIdentity,
        id: &str,
    ) -> Result<Option<Value>> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        let request = Request::get(self.endpoint(&format!("/messages/{id}")))
            .bearer(token.expose());
        Ok(object_or_none(self.http.send(&request).await?))
    }
}
