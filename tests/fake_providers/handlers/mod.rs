//! Request handlers for the fake providers, one module per dialect.

pub mod guerrilla;
pub mod mailtm;
