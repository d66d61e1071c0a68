//! Error types for tempmail-client

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Network error: {cause}")]
    Network { cause: String },

    #[error("HTTP status {status}")]
    Protocol { status: u16 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid mailbox: {0}")]
    Validation(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Response decoding error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn network(cause: impl ToString) -> Self {
        Self::Network {
            cause: cause.to_string(),
        }
    }

    pub(crate) fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Whether the HTTP layer should try the request again.
    ///
    /// Only transport failures and non-success statuses qualify.
    /// Cancellation always propagates immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Protocol { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
