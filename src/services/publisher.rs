use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{MatchView, PostingId, Role};

/// Most recent pair of views, kept for pollers that do not pass a posting id
#[derive(Debug, Clone)]
struct LatestMatch {
    taker: MatchView,
    provider: MatchView,
}

/// Holds computed match views until each party polls for them
///
/// Views are keyed by the polling party's own posting id, so unrelated
/// matches never overwrite each other. Entries expire after the configured
/// TTL. The "latest" pair is last-write-wins across all matches.
pub struct MatchPublisher {
    by_posting: moka::future::Cache<PostingId, MatchView>,
    latest: RwLock<Option<LatestMatch>>,
}

impl MatchPublisher {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let by_posting = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            by_posting,
            latest: RwLock::new(None),
        }
    }

    /// Store both views of a match
    pub async fn publish(&self, taker_view: MatchView, provider_view: MatchView) {
        self.by_posting.insert(taker_view.posting_id, taker_view.clone()).await;
        self.by_posting.insert(provider_view.posting_id, provider_view.clone()).await;

        tracing::debug!(
            "Published match {} for taker {} and provider {}",
            taker_view.match_id,
            taker_view.posting_id,
            provider_view.posting_id
        );

        *self.latest.write().await = Some(LatestMatch {
            taker: taker_view,
            provider: provider_view,
        });
    }

    /// The taker's view, for the given taker posting or the latest match
    pub async fn get_taker_match(&self, posting_id: Option<PostingId>) -> Option<MatchView> {
        self.lookup(Role::Taker, posting_id).await
    }

    /// The provider's view, for the given provider posting or the latest match
    pub async fn get_provider_match(&self, posting_id: Option<PostingId>) -> Option<MatchView> {
        self.lookup(Role::Provider, posting_id).await
    }

    async fn lookup(&self, perspective: Role, posting_id: Option<PostingId>) -> Option<MatchView> {
        match posting_id {
            Some(id) => self
                .by_posting
                .get(&id)
                .await
                .filter(|view| view.perspective == perspective),
            None => self.latest.read().await.as_ref().map(|latest| match perspective {
                Role::Taker => latest.taker.clone(),
                Role::Provider => latest.provider.clone(),
            }),
        }
    }
}

impl Default for MatchPublisher {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}
