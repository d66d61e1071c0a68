//! Guerrilla Mail adapter
//!
//! The service hands out an address together with a `sid_token`; that
//! token travels as a query parameter on every later call.

use super::{MailProvider, ProviderKind, object_or_none};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Request};
use crate::model::{Credential, MailboxIdentity, ProviderHandle};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};

/// Domains Guerrilla Mail delivers to. The API has no listing call.
const DOMAINS: [&str; 5] = [
    "sharklasers.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "guerrillamail.org",
    "grr.la",
];

#[derive(Debug, Deserialize)]
struct AddressResponse {
    email_addr: Option<String>,
    sid_token: Option<String>,
}

#[derive(Debug)]
struct State {
    handle: ProviderHandle,
    sid: Option<Credential>,
}

pub struct GuerrillaProvider {
    http: HttpClient,
    base_url: String,
    state: Mutex<State>,
}

impl GuerrillaProvider {
    #[must_use]
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        let mut handle = ProviderHandle::new(ProviderKind::Guerrilla.as_str());
        handle.cached_domain_list = DOMAINS.map(str::to_string).to_vec();
        Self {
            http,
            base_url: base_url.into(),
            state: Mutex::new(State { handle, sid: None }),
        }
    }

    fn call(&self, function: &str) -> Request {
        Request::get(&self.base_url).query("f", function)
    }

    async fn request_address(&self) -> Result<AddressResponse> {
        let value = self.http.send(&self.call("get_email_address")).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::provider(format!("guerrillamail address response: {e}"))
        })
    }

    fn sid(&self) -> Option<Credential> {
        self.lock().sid.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl MailProvider for GuerrillaProvider {
    fn name(&self) -> &str {
        ProviderKind::Guerrilla.as_str()
    }

    fn handle(&self) -> ProviderHandle {
        self.lock().handle.clone()
    }

    async fn check_health(&self) -> bool {
        let healthy = match self.request_address().await {
            Ok(response) => response.email_addr.is_some(),
            Err(e) => {
                warn!("guerrillamail health check failed: {}", e);
                false
            }
        };
        self.lock().handle.record_health(healthy);
        healthy
    }

    async fn list_domains(&self) -> Result<Vec<String>> {
        Ok(self.lock().handle.cached_domain_list.clone())
    }

    async fn create_mailbox(&self) -> Result<MailboxIdentity> {
        let response = self.request_address().await?;
        let (Some(address), Some(sid)) =
            (response.email_addr, response.sid_token)
        else {
            return Err(Error::provider(
                "guerrillamail response lacks address or session token",
            ));
        };

        let sid = Credential::new(sid);
        let mailbox = MailboxIdentity::from_address(&address, self.name())
            .ok_or_else(|| {
                Error::Validation(format!("guerrillamail issued {address}"))
            })?
            .with_credential(sid.clone());
        self.lock().sid = Some(sid);

        info!("Created guerrillamail mailbox {}", mailbox.address);
        Ok(mailbox)
    }

    async fn list_messages(
        &self,
        _mailbox: &MailboxIdentity,
    ) -> Result<Vec<Value>> {
        let Some(sid) = self.sid() else {
            return Ok(Vec::new());
        };
        let request = self
            .call("check_email")
            .query("seq", "0")
            .query("sid_token", sid.expose());
        let mut value = self.http.send(&request).await?;
        Ok(match value.get_mut("list").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        })
    }

    async fn fetch_message(
        &self,
        _mailbox: &MailboxIdentity,
        id: &str,
    ) -> Result<Option<Value>> {
        let Some(sid) = self.sid() else {
            return Ok(None);
        };
        let request = self
            .call("fetch_email")
            .query("email_id", id)
            .query("sid_token", sid.expose());
        Ok(object_or_none(self.http.send(&request).await?))
    }
}
