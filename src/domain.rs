use crate::errors::RepoError;
use crate::models::{BidRecord, MemeField, MemeRecord, NewMeme, VoteKind};
use async_trait::async_trait;
use uuid::Uuid;

/// Operations on the authoritative meme collection.
///
/// Two implementations exist: an in-memory store for demo mode and a
/// REST-backed store for live mode. Handler code is backend-agnostic.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static {
    /// Lists every meme, newest-first by creation time.
    ///
    /// Must not fail: a backend outage falls back to an in-memory mirror.
    async fn list_all(&self) -> Vec<MemeRecord>;

    /// Inserts a new record at the front of the collection and returns it
    /// in full (caption/vibe still empty at this point).
    async fn create(&self, meme: NewMeme) -> Result<MemeRecord, RepoError>;

    /// Retrieves a single record by id.
    async fn get(&self, id: Uuid) -> Result<MemeRecord, RepoError>;

    /// Atomically bumps one vote counter and returns the new value.
    /// Concurrent votes on the same id must not lose updates.
    async fn increment_vote(&self, id: Uuid, kind: VoteKind) -> Result<u64, RepoError>;

    /// Records a bid, unconditionally overwriting the highest bid/bidder
    /// pair. Any positive amount wins, even one lower than the current bid.
    async fn apply_bid(&self, id: Uuid, credits: u64, user_id: &str)
    -> Result<BidRecord, RepoError>;

    /// Writes an enriched text field. A missing id is logged and swallowed:
    /// enrichment may race with record lifetime and must never crash the
    /// pipeline.
    async fn set_field(&self, id: Uuid, field: MemeField, value: &str);
}

/// External text-generation provider used by the enrichment service.
///
/// Implementations are fallible; the enrichment service turns every failure
/// into fallback content before any caller sees it.
#[async_trait]
pub trait TextProvider: Send + Sync + 'static {
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;
}
