//! Read results that say where the data came from

use crate::error::Error;

/// Result of a read that may be served from cache or degrade instead of
/// failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Fetched from the provider just now.
    Fresh(T),
    /// Served from a local cache without touching the network.
    Cached(T),
    /// The fetch failed; this is the last value that succeeded.
    Stale { value: T, error: Error },
    /// Nothing to return: no mailbox, no session, or no such message.
    Absent,
    /// The fetch failed and there is nothing to fall back to.
    Failed(Error),
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fresh(v)
            | Self::Cached(v)
            | Self::Stale { value: v, .. } => Some(v),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Fresh(v)
            | Self::Cached(v)
            | Self::Stale { value: v, .. } => Some(v),
            Self::Absent | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Stale { error, .. } | Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}
