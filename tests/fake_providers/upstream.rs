//! Test state shared by all fake provider handlers
//!
//! ```ignore
//! let upstream = UpstreamBuilder::new()
//!     .onesecmail(Mode::Rejecting)
//!     .mailtm(Mode::Down)
//!     .message("m1", "alice@example.com", Some("Hello"), "Hi there")
//!     .build();
//! ```
//!
//! Every mailbox sees the same inbox. Modes can be flipped while the
//! server is running to simulate an outage mid-test.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// How a fake provider behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Serves every call normally.
    Up,
    /// Answers every call with HTTP 503.
    Down,
    /// Reachable, but refuses to hand out a mailbox.
    Rejecting,
}

impl Mode {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Rejecting => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Up,
            1 => Self::Down,
            _ => Self::Rejecting,
        }
    }
}

/// Per-provider switches and counters.
#[derive(Debug)]
pub struct ProviderState {
    mode: AtomicU8,
    requests: AtomicUsize,
    message_reads: AtomicUsize,
}

impl ProviderState {
    fn new(mode: Mode) -> Self {
        Self {
            mode: AtomicU8::new(mode.to_u8()),
            requests: AtomicUsize::new(0),
            message_reads: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.to_u8(), Ordering::SeqCst);
    }

    /// Count a request and report whether it should be served.
    pub fn hit(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.mode() != Mode::Down
    }

    pub fn record_read(&self) {
        self.message_reads.fetch_add(1, Ordering::SeqCst);
    }

    /// Total requests received, including refused ones.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Single-message reads that were served.
    pub fn message_reads(&self) -> usize {
        self.message_reads.load(Ordering::SeqCst)
    }
}

/// A message delivered to every fake mailbox.
#[derive(Debug, Clone)]
pub struct TestMessage {
    pub id: String,
    pub from: String,
    pub subject: Option<String>,
    pub body: String,
}

/// A registered mail.tm account.
#[derive(Debug, Clone)]
pub struct Account {
    pub address: String,
    pub password: String,
    pub token: String,
}

#[derive(Debug)]
pub struct Upstream {
    pub onesecmail: ProviderState,
    pub mailtm: ProviderState,
    pub guerrilla: ProviderState,
    pub inbox: Mutex<Vec<TestMessage>>,
    pub accounts: Mutex<Vec<Account>>,
    pub sessions: Mutex<Vec<String>>,
}

impl Upstream {
    pub fn find_message(&self, id: &str) -> Option<TestMessage> {
        self.inbox
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn messages(&self) -> Vec<TestMessage> {
        self.inbox.lock().unwrap().clone()
    }

    pub fn deliver(&self, message: TestMessage) {
        self.inbox.lock().unwrap().push(message);
    }
}

pub struct UpstreamBuilder {
    modes: [Mode; 3],
    inbox: Vec<TestMessage>,
}

impl UpstreamBuilder {
    pub fn new() -> Self {
        Self {
            modes: [Mode::Up; 3],
            inbox: Vec::new(),
        }
    }

    pub fn onesecmail(mut self, mode: Mode) -> Self {
        self.modes[0] = mode;
        self
    }

    pub fn mailtm(mut self, mode: Mode) -> Self {
        self.modes[1] = mode;
        self
    }

    pub fn guerrilla(mut self, mode: Mode) -> Self {
        self.modes[2] = mode;
        self
    }

    /// Add a message; `subject: None` omits the field entirely.
    pub fn message(
        mut self,
        id: &str,
        from: &str,
        subject: Option<&str>,
        body: &str,
    ) -> Self {
        self.inbox.push(TestMessage {
            id: id.to_string(),
            from: from.to_string(),
            subject: subject.map(str::to_string),
            body: body.to_string(),
        });
        self
    }

    pub fn build(self) -> Upstream {
        Upstream {
            onesecmail: ProviderState::new(self.modes[0]),
            mailtm: ProviderState::new(self.modes[1]),
            guerrilla: ProviderState::new(self.modes[2]),
            inbox: Mutex::new(self.inbox),
            accounts: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }
}
