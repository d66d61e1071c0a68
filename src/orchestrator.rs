//! Provider selection, mailbox lifecycle, and cached reads
//!
//! The [`Orchestrator`] owns the active mailbox, the pinned provider,
//! the read caches, and the counters. Adapter failures never escape:
//! creation falls back to the next provider (and finally to a local
//! synthetic address), listing serves stale data, and single-message
//! reads report [`Outcome::Failed`] or [`Outcome::Absent`].
//!
//! Concurrent `create_mailbox` calls are not serialized; the last one
//! to finish decides the pinned provider and mailbox.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::model::{
    MailboxIdentity, MessageDetail, MessageSummary, ProviderHandle, Stats,
    generate_login,
};
use crate::normalize;
use crate::outcome::Outcome;
use crate::provider::{
    GuerrillaProvider, MailProvider, MailTmProvider, OneSecMailProvider,
    SYNTHETIC_DOMAIN,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Repeated listings inside this window are served from memory.
pub const LIST_CACHE_WINDOW: Duration = Duration::from_secs(2);

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(3000);
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_millis(10_000);

/// Shared, immutable message list.
pub type Summaries = Arc<[MessageSummary]>;

/// Lifecycle of provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Selecting,
    Ready,
    /// No provider answered the health probe; the first one is pinned
    /// anyway.
    Degraded,
}

/// Clamp a requested polling interval into the supported range.
#[must_use]
pub fn clamp_refresh_interval(requested: Option<Duration>) -> Duration {
    requested
        .unwrap_or(DEFAULT_REFRESH_INTERVAL)
        .clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL)
}

#[derive(Debug)]
struct State {
    phase: Phase,
    pinned: usize,
    mailbox: Option<MailboxIdentity>,
    summaries: Summaries,
    listed_at: Option<Instant>,
    read_cache: HashMap<String, MessageDetail>,
}

impl State {
    fn clear_caches(&mut self) {
        self.summaries = empty_summaries();
        self.listed_at = None;
        self.read_cache.clear();
    }
}

#[derive(Debug, Default)]
struct Counters {
    mailboxes_created: AtomicU64,
    messages_fetched: AtomicU64,
    provider_switches: AtomicU64,
}

struct AutoRefresh {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Orchestrator {
    providers: Vec<Arc<dyn MailProvider>>,
    state: Mutex<State>,
    counters: Counters,
    auto_refresh: Mutex<Option<AutoRefresh>>,
}

impl Orchestrator {
    /// Build an orchestrator over the three public providers, in
    /// priority order: 1secmail, mail.tm, Guerrilla Mail.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::new(config.retry)?;
        let urls = &config.providers;
        Self::with_providers(vec![
            Arc::new(OneSecMailProvider::new(http.clone(), &urls.one_sec_mail)),
            Arc::new(MailTmProvider::new(http.clone(), &urls.mail_tm)),
            Arc::new(GuerrillaProvider::new(http, &urls.guerrilla)),
        ])
    }

    /// Build an orchestrator over an arbitrary ordered provider set.
    ///
    /// The first provider is the default when nothing is healthy and
    /// the target of synthetic mailboxes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `providers` is empty.
    pub fn with_providers(
        providers: Vec<Arc<dyn MailProvider>>,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Config(
                "at least one provider is required".into(),
            ));
        }
        Ok(Self {
            providers,
            state: Mutex::new(State {
                phase: Phase::Uninitialized,
                pinned: 0,
                mailbox: None,
                summaries: empty_summaries(),
                listed_at: None,
                read_cache: HashMap::new(),
            }),
            counters: Counters::default(),
            auto_refresh: Mutex::new(None),
        })
    }

    /// Probe providers in priority order and pin the first healthy one.
    ///
    /// While a mailbox is active the provider that issued it stays
    /// pinned, since its login is meaningless anywhere else; the probe
    /// then only refreshes health and the phase. Returns the name of the
    /// pinned provider.
    pub async fn initialize(&self) -> String {
        self.lock().phase = Phase::Selecting;

        let healthy = self.probe().await;
        let mut state = self.lock();
        if state.mailbox.is_none() {
            state.pinned = healthy.unwrap_or(0);
        } else if healthy.is_some_and(|index| index != state.pinned) {
            debug!(
                "Keeping {} pinned for the active mailbox",
                self.providers[state.pinned].name()
            );
        }

        let pinned = self.providers[state.pinned].name();
        if healthy.is_some() {
            state.phase = Phase::Ready;
            info!("Pinned healthy provider {}", pinned);
        } else {
            state.phase = Phase::Degraded;
            warn!("No provider is healthy, defaulting to {}", pinned);
        }
        pinned.to_string()
    }

    async fn probe(&self) -> Option<usize> {
        for (index, provider) in self.providers.iter().enumerate() {
            if provider.check_health().await {
                return Some(index);
            }
            debug!("Provider {} is unhealthy", provider.name());
        }
        None
    }

    /// Create a mailbox on the first provider that accepts, falling
    /// back to a local synthetic address when all of them fail.
    ///
    /// Always starts from the top of the priority list, whichever
    /// provider is currently pinned. Returns the new address.
    pub async fn create_mailbox(&self) -> String {
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.create_mailbox().await.and_then(validate) {
                Ok(mailbox) => {
                    self.counters
                        .mailboxes_created
                        .fetch_add(1, Ordering::Relaxed);
                    return self.install(index, mailbox);
                }
                Err(e) => {
                    self.counters
                        .provider_switches
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Mailbox creation on {} failed: {}",
                        provider.name(),
                        e
                    );
                }
            }
        }

        let fallback = &self.providers[0];
        let mailbox = MailboxIdentity::new(
            generate_login(),
            SYNTHETIC_DOMAIN,
            fallback.name(),
        );
        warn!(
            "Every provider failed, using synthetic mailbox {}",
            mailbox.address
        );
        self.install(0, mailbox)
    }

    /// Drop the current mailbox and create a new one.
    pub async fn refresh_mailbox(&self) -> String {
        self.stop_auto_refresh();
        self.lock().clear_caches();
        self.create_mailbox().await
    }

    /// Message list of the active mailbox.
    ///
    /// Calls inside [`LIST_CACHE_WINDOW`] of the last successful fetch
    /// are answered from memory. A failed fetch returns the last good
    /// list as [`Outcome::Stale`].
    pub async fn list_messages(&self) -> Outcome<Summaries> {
        let (provider, mailbox) = {
            let state = self.lock();
            if state
                .listed_at
                .is_some_and(|at| at.elapsed() < LIST_CACHE_WINDOW)
            {
                return Outcome::Cached(state.summaries.clone());
            }
            let Some(mailbox) = state.mailbox.clone() else {
                return Outcome::Absent;
            };
            (self.providers[state.pinned].clone(), mailbox)
        };

        match provider.list_messages(&mailbox).await {
            Ok(records) => {
                let summaries: Summaries =
                    records.iter().map(normalize::summarize).collect();
                let mut state = self.lock();
                // A mailbox swap during the fetch makes these results
                // meaningless for the cache.
                if state.mailbox.as_ref() == Some(&mailbox) {
                    state.summaries = summaries.clone();
                    state.listed_at = Some(Instant::now());
                }
                debug!(
                    "Listed {} messages from {}",
                    summaries.len(),
                    provider.name()
                );
                Outcome::Fresh(summaries)
            }
            Err(error) => {
                warn!(
                    "Listing messages on {} failed: {}",
                    provider.name(),
                    error
                );
                Outcome::Stale {
                    value: self.lock().summaries.clone(),
                    error,
                }
            }
        }
    }

    /// A single message of the active mailbox, served from the read
    /// cache when possible.
    pub async fn get_message(&self, id: &str) -> Outcome<MessageDetail> {
        let (provider, mailbox) = {
            let state = self.lock();
            if let Some(hit) = state.read_cache.get(id) {
                return Outcome::Cached(hit.clone());
            }
            let Some(mailbox) = state.mailbox.clone() else {
                return Outcome::Absent;
            };
            (self.providers[state.pinned].clone(), mailbox)
        };

        match provider.fetch_message(&mailbox, id).await {
            Ok(Some(record)) => {
                let mut detail = normalize::detail(&record);
                if detail.id.is_empty() {
                    detail.id = id.to_string();
                }
                let mut state = self.lock();
                if state.mailbox.as_ref() == Some(&mailbox) {
                    state.read_cache.insert(id.to_string(), detail.clone());
                }
                self.counters
                    .messages_fetched
                    .fetch_add(1, Ordering::Relaxed);
                Outcome::Fresh(detail)
            }
            Ok(None) => {
                debug!("Message {} not found on {}", id, provider.name());
                Outcome::Absent
            }
            Err(e) => {
                warn!(
                    "Fetching message {} on {} failed: {}",
                    id,
                    provider.name(),
                    e
                );
                Outcome::Failed(e)
            }
        }
    }

    /// Poll [`list_messages`](Self::list_messages) on a fixed cadence and
    /// hand every result to `callback`.
    ///
    /// The interval is clamped with [`clamp_refresh_interval`]; the
    /// effective value is returned. Any previous schedule is cancelled
    /// first. A panicking callback is logged and polling continues.
    pub fn start_auto_refresh<F>(
        self: &Arc<Self>,
        callback: F,
        interval: Option<Duration>,
    ) -> Duration
    where
        F: Fn(Summaries) + Send + Sync + 'static,
    {
        let period = clamp_refresh_interval(interval);
        self.stop_auto_refresh();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this: Weak<Self> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(orchestrator) = this.upgrade() else {
                    break;
                };
                let summaries = orchestrator
                    .list_messages()
                    .await
                    .into_value()
                    .unwrap_or_else(empty_summaries);
                drop(orchestrator);

                let delivered = std::panic::catch_unwind(AssertUnwindSafe(
                    || callback(summaries),
                ));
                if delivered.is_err() {
                    warn!("Auto-refresh callback panicked; polling continues");
                }
            }
            debug!("Auto-refresh stopped");
        });

        info!("Auto-refresh every {:?}", period);
        *self.auto_refresh_slot() = Some(AutoRefresh { cancel, task });
        period
    }

    /// Cancel scheduled polling. A poll already in flight finishes.
    pub fn stop_auto_refresh(&self) {
        if let Some(schedule) = self.auto_refresh_slot().take() {
            schedule.cancel.cancel();
        }
    }

    #[must_use]
    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh_slot()
            .as_ref()
            .is_some_and(|schedule| !schedule.task.is_finished())
    }

    #[must_use]
    pub fn active_address(&self) -> Option<String> {
        self.lock().mailbox.as_ref().map(|m| m.address.clone())
    }

    #[must_use]
    pub fn active_identity(&self) -> Option<MailboxIdentity> {
        self.lock().mailbox.clone()
    }

    #[must_use]
    pub fn active_provider_name(&self) -> String {
        let pinned = self.lock().pinned;
        self.providers[pinned].name().to_string()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        let counters = &self.counters;
        Stats {
            mailboxes_created: counters
                .mailboxes_created
                .load(Ordering::Relaxed),
            messages_fetched: counters.messages_fetched.load(Ordering::Relaxed),
            provider_switches: counters
                .provider_switches
                .load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn provider_handles(&self) -> Vec<ProviderHandle> {
        self.providers.iter().map(|p| p.handle()).collect()
    }

    // -- private helpers --

    fn install(&self, index: usize, mailbox: MailboxIdentity) -> String {
        let address = mailbox.address.clone();
        let mut state = self.lock();
        state.pinned = index;
        state.phase = Phase::Ready;
        state.mailbox = Some(mailbox);
        state.clear_caches();
        info!(
            "Active mailbox {} on {}",
            address,
            self.providers[index].name()
        );
        address
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn auto_refresh_slot(&self) -> MutexGuard<'_, Option<AutoRefresh>> {
        self.auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop_auto_refresh();
    }
}

fn validate(mailbox: MailboxIdentity) -> Result<MailboxIdentity> {
    if mailbox.is_valid() {
        Ok(mailbox)
    } else {
        Err(Error::Validation(mailbox.address))
    }
}

fn empty_summaries() -> Summaries {
    Arc::from(Vec::new())
}
