//! In-process fake provider server
//!
//! Binds `127.0.0.1:0`, mounts the three dialects under their own path
//! prefixes, and serves them from a background task until dropped.

use super::handlers::{guerrilla, mailtm, onesecmail};
use super::upstream::Upstream;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use tempmail_client::{ClientConfig, ProviderUrls, RetryPolicy};
use tokio::net::TcpListener;

pub struct FakeProviderServer {
    port: u16,
    upstream: Arc<Upstream>,
    /// Handle to the background task so it lives as long as the server.
    handle: tokio::task::JoinHandle<()>,
}

impl FakeProviderServer {
    pub async fn start(upstream: Upstream) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();
        let upstream = Arc::new(upstream);

        let router = Router::new()
            .route("/onesecmail/api/v1/", get(onesecmail::api))
            .route("/mailtm/domains", get(mailtm::domains))
            .route("/mailtm/accounts", post(mailtm::accounts))
            .route("/mailtm/token", post(mailtm::token))
            .route("/mailtm/messages", get(mailtm::messages))
            .route("/mailtm/messages/{id}", get(mailtm::message))
            .route("/guerrilla/ajax.php", get(guerrilla::ajax))
            .with_state(upstream.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            port,
            upstream,
            handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn urls(&self) -> ProviderUrls {
        let base = format!("http://127.0.0.1:{}", self.port);
        ProviderUrls {
            one_sec_mail: format!("{base}/onesecmail/api/v1/"),
            mail_tm: format!("{base}/mailtm"),
            guerrilla: format!("{base}/guerrilla/ajax.php"),
        }
    }

    /// Client configuration pointing at this server, with short
    /// backoff so failure paths stay fast.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            providers: self.urls(),
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(10),
                multiplier: 2,
                timeout: Duration::from_secs(5),
            },
        }
    }
}

impl Drop for FakeProviderServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
