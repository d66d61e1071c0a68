#![allow(dead_code)]

//! Fake mailbox providers for integration testing
//!
//! An in-process HTTP server that speaks the three upstream dialects
//! closely enough to exercise the real adapters end-to-end:
//!
//! - `/onesecmail/api/v1/` -- 1secmail, `action=` query API
//! - `/mailtm/...` -- mail.tm, JSON-LD collections and bearer tokens
//! - `/guerrilla/ajax.php` -- Guerrilla Mail, `f=` calls with `sid_token`
//!
//! ## Module layout
//!
//! - `server` -- listener, router, and the client config pointing at it
//! - `handlers/` -- one file per provider dialect
//! - `upstream` -- shared test state (modes, inbox, request counters)

mod handlers;
mod server;
pub mod upstream;

pub use server::FakeProviderServer;
pub use upstream::{Mode, UpstreamBuilder};
