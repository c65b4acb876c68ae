//! The abstract remote feed collaborator

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use newswire_core::FeedItem;

use crate::error::FeedError;

/// Remote source of reverse-chronological message history.
///
/// Implementations are keyed by a channel identity string, so the rest of
/// the pipeline never handles provider-specific peer types. Connection
/// lifecycle is owned by the implementation; callers only observe it through
/// [`FeedProvider::is_connected`].
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Check whether the channel identity resolves on the remote side.
    async fn resolve_peer(&self, identity: &str) -> Result<bool, FeedError>;

    /// Fetch one newest-first page of history at the given offset.
    async fn fetch_history(
        &self,
        identity: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeedItem>, FeedError>;

    /// Send a message to the peer. Not used by the backfill path itself, but
    /// part of the collaborator surface (summary delivery).
    async fn send_message(&self, identity: &str, text: &str) -> Result<(), FeedError>;

    /// Whether the underlying connection is currently live.
    async fn is_connected(&self) -> bool;
}

/// In-memory provider over a fixed newest-first item list.
///
/// Serves offline replay of captured history and doubles as the fixture for
/// cursor, extractor and backfill tests: it counts remote fetches so callers
/// can assert that the cache layer actually short-circuits.
pub struct StaticProvider {
    items: Vec<FeedItem>,
    resolvable: bool,
    connected: AtomicBool,
    fetch_calls: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl StaticProvider {
    /// Build a provider over items that must already be in descending
    /// timestamp order (newest first).
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            resolvable: true,
            connected: AtomicBool::new(true),
            fetch_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make every peer resolution fail (peer unknown).
    pub fn unresolvable(mut self) -> Self {
        self.resolvable = false;
        self
    }

    /// Report the connection as down.
    pub fn disconnected(self) -> Self {
        self.connected.store(false, Ordering::SeqCst);
        self
    }

    /// Flip the reported connection state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of history fetches that reached this provider.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Messages delivered through [`FeedProvider::send_message`].
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FeedProvider for StaticProvider {
    async fn resolve_peer(&self, _identity: &str) -> Result<bool, FeedError> {
        Ok(self.resolvable)
    }

    async fn fetch_history(
        &self,
        _identity: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeedItem>, FeedError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let end = (offset + limit).min(self.items.len());
        let start = offset.min(end);
        Ok(self.items[start..end].to_vec())
    }

    async fn send_message(&self, identity: &str, text: &str) -> Result<(), FeedError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| FeedError::Io("sent-message log poisoned".to_string()))?;
        sent.push((identity.to_string(), text.to_string()));
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
