//! Disposable mailbox client library
//!
//! Provisions throwaway email addresses and reads their inboxes using
//! whichever of several public providers is reachable: 1secmail,
//! mail.tm, and Guerrilla Mail. This is receive-only.
//!
//! The [`Orchestrator`] probes providers in priority order, creates
//! mailboxes with fallback across them, and serves message lists and
//! bodies through short-lived caches. Provider-specific JSON is mapped
//! onto [`MessageSummary`] and [`MessageDetail`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tempmail_client::{ClientConfig, Orchestrator};
//!
//! # async fn run() -> tempmail_client::Result<()> {
//! let mailbox = Arc::new(Orchestrator::new(&ClientConfig::from_env()?)?);
//! mailbox.initialize().await;
//! println!("Send mail to {}", mailbox.create_mailbox().await);
//! mailbox.start_auto_refresh(
//!     |messages| println!("{} messages", messages.len()),
//!     None,
//! );
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod http;
mod legacy;
mod model;
mod normalize;
mod orchestrator;
mod outcome;
pub mod provider;

pub use config::{ClientConfig, ProviderUrls, RetryPolicy};
pub use error::{Error, Result};
pub use http::{HttpClient, Request, retry_with_backoff};
pub use legacy::LegacyMailbox;
pub use model::{
    Credential, MailboxIdentity, MessageDetail, MessageSummary, NO_SUBJECT,
    ProviderHandle, Stats, generate_login, is_valid_address,
};
pub use normalize::{
    detail as normalize_detail, summarize as normalize_summary,
};
pub use orchestrator::{
    DEFAULT_REFRESH_INTERVAL, LIST_CACHE_WINDOW, MAX_REFRESH_INTERVAL,
    MIN_REFRESH_INTERVAL, Orchestrator, Phase, Summaries,
    clamp_refresh_interval,
};
pub use outcome::Outcome;
pub use provider::{MailProvider, ProviderKind};
