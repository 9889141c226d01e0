use crate::domain::MemeRepository;
use crate::models::MemeRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_TOP: usize = 10;

/// TTL cache over the upvote ranking.
///
/// Holds the full sorted list and slices it per request, so one computation
/// serves every `top` value. Any successful vote invalidates immediately;
/// otherwise entries live for the TTL (30 s in production). Demo mode
/// constructs the cache disabled and recomputes per call.
pub struct LeaderboardCache {
    ttl: Duration,
    enabled: bool,
    entry: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    computed_at: Instant,
    ranked: Vec<MemeRecord>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration, enabled: bool) -> Self {
        Self {
            ttl,
            enabled,
            entry: Mutex::new(None),
        }
    }

    /// Production configuration: 30-second TTL.
    pub fn with_default_ttl(enabled: bool) -> Self {
        Self::new(Duration::from_secs(30), enabled)
    }

    /// Returns the top `n` records by upvotes, descending, stable under
    /// ties (preserving the store's newest-first listing order).
    pub async fn top(&self, store: &Arc<dyn MemeRepository>, n: usize) -> Vec<MemeRecord> {
        if !self.enabled {
            return rank(store.list_all().await, n);
        }

        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.computed_at.elapsed() < self.ttl {
                debug!("Leaderboard cache hit");
                let mut ranked = cached.ranked.clone();
                ranked.truncate(n);
                return ranked;
            }
        }

        let ranked = rank_all(store.list_all().await);
        *entry = Some(CacheEntry {
            computed_at: Instant::now(),
            ranked: ranked.clone(),
        });
        let mut ranked = ranked;
        ranked.truncate(n);
        ranked
    }

    /// Drops the cached ranking regardless of TTL. Called on every vote.
    pub async fn invalidate(&self) {
        let mut entry = self.entry.lock().await;
        *entry = None;
    }
}

fn rank_all(mut records: Vec<MemeRecord>) -> Vec<MemeRecord> {
    // Stable sort keeps the underlying listing order for ties.
    records.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
    records
}

fn rank(records: Vec<MemeRecord>, n: usize) -> Vec<MemeRecord> {
    let mut ranked = rank_all(records);
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMeme, VoteKind};
    use crate::repositories::InMemoryMemeStore;

    async fn store_with_upvotes(upvotes: &[u64]) -> Arc<dyn MemeRepository> {
        let store = InMemoryMemeStore::new();
        for (i, &count) in upvotes.iter().enumerate() {
            let meme = store
                .create(NewMeme::with_defaults(format!("meme-{}", i), None, None))
                .await
                .unwrap();
            for _ in 0..count {
                store.increment_vote(meme.id, VoteKind::Up).await.unwrap();
            }
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn top_sorts_descending_and_truncates() {
        let store = store_with_upvotes(&[69, 42, 128, 84, 156]).await;
        let cache = LeaderboardCache::with_default_ttl(false);

        let top = cache.top(&store, 2).await;
        let upvotes: Vec<u64> = top.iter().map(|m| m.upvotes).collect();
        assert_eq!(upvotes, vec![156, 128]);
    }

    #[tokio::test]
    async fn ties_preserve_listing_order() {
        let store = store_with_upvotes(&[5, 5, 5]).await;
        let cache = LeaderboardCache::with_default_ttl(false);

        let listing = store.list_all().await;
        let top = cache.top(&store, 3).await;
        let listed_ids: Vec<_> = listing.iter().map(|m| m.id).collect();
        let ranked_ids: Vec<_> = top.iter().map(|m| m.id).collect();
        assert_eq!(listed_ids, ranked_ids);
    }

    #[tokio::test]
    async fn cache_serves_stale_until_invalidated() {
        let store = store_with_upvotes(&[3, 1]).await;
        let cache = LeaderboardCache::new(Duration::from_secs(3600), true);

        let before = cache.top(&store, 10).await;
        assert_eq!(before[0].upvotes, 3);

        // Push the second meme past the first; the cache has not been told.
        let loser_id = before[1].id;
        for _ in 0..5 {
            store.increment_vote(loser_id, VoteKind::Up).await.unwrap();
        }
        let stale = cache.top(&store, 10).await;
        assert_eq!(stale[0].upvotes, 3);

        cache.invalidate().await;
        let fresh = cache.top(&store, 10).await;
        assert_eq!(fresh[0].upvotes, 6);
        assert_eq!(fresh[0].id, loser_id);
    }

    #[tokio::test]
    async fn disabled_cache_always_recomputes() {
        let store = store_with_upvotes(&[2, 1]).await;
        let cache = LeaderboardCache::new(Duration::from_secs(3600), false);

        let before = cache.top(&store, 10).await;
        let loser_id = before[1].id;
        for _ in 0..5 {
            store.increment_vote(loser_id, VoteKind::Up).await.unwrap();
        }
        let after = cache.top(&store, 10).await;
        assert_eq!(after[0].id, loser_id);
    }

    #[tokio::test]
    async fn result_is_never_longer_than_n() {
        let store = store_with_upvotes(&[1, 2, 3]).await;
        let cache = LeaderboardCache::with_default_ttl(false);
        assert_eq!(cache.top(&store, 2).await.len(), 2);
        assert_eq!(cache.top(&store, 10).await.len(), 3);
    }
}
