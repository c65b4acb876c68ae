//! Cached pagination over a remote newest-first feed

use std::sync::Arc;

use newswire_core::FeedItem;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::provider::FeedProvider;

/// Page size used by history walks.
pub const PAGE_SIZE: usize = 100;

/// A randomly-offsettable, cached view over a remote reverse-chronological
/// feed.
///
/// The cache is append-only: its contents are a prefix of the true remote
/// sequence, monotonically growing and never reordered. Once end-of-history
/// has been observed the flag is sticky and later fetches slice the cache
/// without contacting the provider.
pub struct ChannelCursor {
    provider: Arc<dyn FeedProvider>,
    channel: String,
    cache: Vec<FeedItem>,
    end_of_history: bool,
    /// Set once a readiness check has succeeded; a failed check is re-probed
    ready: bool,
}

impl ChannelCursor {
    pub fn new(provider: Arc<dyn FeedProvider>, channel: impl Into<String>) -> Self {
        Self {
            provider,
            channel: channel.into(),
            cache: Vec::new(),
            end_of_history: false,
            ready: false,
        }
    }

    /// Channel identity this cursor walks.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the remote feed has been exhausted.
    pub fn end_of_history(&self) -> bool {
        self.end_of_history
    }

    /// Number of items currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Readiness: the peer resolves and the connection is live.
    ///
    /// Both sub-checks are awaited. Only success is memoized: a not-ready
    /// cursor serves empty pages and probes again on the next fetch, so a
    /// transient disconnect never wedges the cursor. Transport errors
    /// propagate.
    async fn is_ready(&mut self) -> Result<bool, FeedError> {
        if self.ready {
            return Ok(true);
        }
        let resolved = self.provider.resolve_peer(&self.channel).await?;
        let ready = resolved && self.provider.is_connected().await;
        if ready {
            self.ready = true;
        } else {
            warn!(channel = %self.channel, resolved, "channel not ready, serving empty pages");
        }
        Ok(ready)
    }

    /// Fetch the window `[offset, offset + limit)` of the feed.
    ///
    /// Served from the cache when fully covered; otherwise remote fetches
    /// extend the cache from its tail until the window is covered or the
    /// feed runs out. End-of-history is recorded when a remote fetch returns
    /// fewer items than requested (zero included).
    pub async fn fetch_page(
        &mut self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<FeedItem>, FeedError> {
        if !self.is_ready().await? {
            return Ok(Vec::new());
        }

        // Remote fetches always start at the cache tail, so the cache stays
        // a contiguous prefix of the feed whatever window is requested.
        while offset + limit > self.cache.len() && !self.end_of_history {
            debug!(
                channel = %self.channel,
                limit,
                offset,
                cached = self.cache.len(),
                "fetching history page"
            );
            let fetched = self
                .provider
                .fetch_history(&self.channel, limit, self.cache.len())
                .await?;
            if fetched.len() < limit {
                debug!(channel = %self.channel, "end of history reached");
                self.end_of_history = true;
            }
            self.cache.extend(fetched);
        }

        let end = (offset + limit).min(self.cache.len());
        let start = offset.min(end);
        Ok(self.cache[start..end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;

    fn descending_items(count: i64) -> Vec<FeedItem> {
        (0..count)
            .map(|i| FeedItem::from_unix(1_700_000_000 - i * 60, format!("m{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_reads() {
        let provider = Arc::new(StaticProvider::new(descending_items(10)));
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        let first = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(provider.fetch_calls(), 1);

        // same window again: cache only
        let again = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(provider.fetch_calls(), 1);

        // next window requires one more remote fetch
        let next = cursor.fetch_page(4, 4).await.unwrap();
        assert_eq!(next.len(), 4);
        assert_eq!(next[0].body, "m4");
        assert_eq!(provider.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_end_of_history_is_sticky() {
        let provider = Arc::new(StaticProvider::new(descending_items(5)));
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        // 5 items against a window of 8: short page marks end of history
        let page = cursor.fetch_page(8, 0).await.unwrap();
        assert_eq!(page.len(), 5);
        assert!(cursor.end_of_history());
        assert_eq!(provider.fetch_calls(), 1);

        // every further fetch slices the cache without touching the provider
        let past = cursor.fetch_page(8, 8).await.unwrap();
        assert!(past.is_empty());
        let tail = cursor.fetch_page(8, 3).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(provider.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_item_fetch_marks_end_of_history() {
        let provider = Arc::new(StaticProvider::new(descending_items(4)));
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        let page = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(page.len(), 4);
        assert!(!cursor.end_of_history());

        let page = cursor.fetch_page(4, 4).await.unwrap();
        assert!(page.is_empty());
        assert!(cursor.end_of_history());
        assert_eq!(provider.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_jump_ahead_keeps_cache_prefix_aligned() {
        let provider = Arc::new(StaticProvider::new(descending_items(10)));
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        // a window past the cached prefix backfills the gap first
        let page = cursor.fetch_page(4, 8).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].body, "m8");
        assert!(cursor.end_of_history());
        assert_eq!(provider.fetch_calls(), 3);

        // earlier windows slice the same prefix, cache only
        let head = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(head.len(), 4);
        assert_eq!(head[0].body, "m0");
        assert_eq!(provider.fetch_calls(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_window_does_not_duplicate_cache() {
        let provider = Arc::new(StaticProvider::new(descending_items(10)));
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        cursor.fetch_page(4, 0).await.unwrap();
        // straddles the cache tail: the fetch extends from the tail, never
        // re-appending already cached items
        let page = cursor.fetch_page(4, 2).await.unwrap();
        let bodies: Vec<&str> = page.iter().map(|i| i.body.as_str()).collect();
        assert_eq!(bodies, vec!["m2", "m3", "m4", "m5"]);
        assert_eq!(cursor.cached_len(), 8);
    }

    #[tokio::test]
    async fn test_unresolved_peer_serves_empty_pages() {
        let provider = Arc::new(StaticProvider::new(descending_items(5)).unresolvable());
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        let page = cursor.fetch_page(4, 0).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_provider_serves_empty_pages() {
        let provider = Arc::new(StaticProvider::new(descending_items(5)).disconnected());
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        let page = cursor.fetch_page(4, 0).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(provider.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_readiness_recovers_after_reconnect() {
        let provider = Arc::new(StaticProvider::new(descending_items(5)).disconnected());
        let mut cursor = ChannelCursor::new(provider.clone(), "wire");

        assert!(cursor.fetch_page(4, 0).await.unwrap().is_empty());
        assert_eq!(provider.fetch_calls(), 0);

        // the next fetch probes again instead of trusting the failed check
        provider.set_connected(true);
        let page = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(page.len(), 4);
        assert_eq!(provider.fetch_calls(), 1);

        // a later drop does not disturb an established cursor
        provider.set_connected(false);
        let again = cursor.fetch_page(4, 0).await.unwrap();
        assert_eq!(again, page);
        assert_eq!(provider.fetch_calls(), 1);
    }
}
