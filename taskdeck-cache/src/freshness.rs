//! Entry status and freshness policy.
//!
//! Staleness is explicit: every read returns a [`CacheEntry`] carrying the
//! entry's status, its last error and the age of its data, and callers decide
//! what to show.

use std::sync::Arc;
use std::time::Duration;

use taskdeck_core::RemoteError;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Never fetched, or cancelled before the first response.
    Empty,
    /// First fetch in flight; no data yet.
    Loading,
    /// Data matches the last authoritative response.
    Fresh,
    /// Data is still shown but the next read refetches it.
    Stale,
    /// The last fetch failed. Earlier data, if any, is kept.
    Error,
}

impl EntryStatus {
    /// Whether a plain read should start a fetch for an entry in this state.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, EntryStatus::Empty | EntryStatus::Stale)
    }
}

/// Configuration of a query cache.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Age after which fresh data is refreshed in the background on read.
    /// `None` keeps data fresh until it is invalidated.
    pub stale_after: Option<Duration>,
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the background refresh age.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = Some(stale_after);
        self
    }

    pub(crate) fn is_expired(&self, age: Duration) -> bool {
        self.stale_after.is_some_and(|limit| age >= limit)
    }
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Last known good data.
    pub data: Option<Arc<V>>,
    pub status: EntryStatus,
    pub last_error: Option<RemoteError>,
    /// Whether a fetch for this key is currently in flight.
    pub is_fetching: bool,
    /// Time since the data was last written by a fetch or `write`.
    pub age: Option<Duration>,
}

impl<V> CacheEntry<V> {
    pub(crate) fn empty() -> Self {
        Self {
            data: None,
            status: EntryStatus::Empty,
            last_error: None,
            is_fetching: false,
            age: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_fresh(&self) -> bool {
        self.status == EntryStatus::Fresh
    }

    /// True while there is nothing to show yet but a response is expected.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && (self.status == EntryStatus::Loading || self.is_fetching)
    }

    pub fn value(&self) -> Option<&V> {
        self.data.as_deref()
    }
}
