use crate::{
    config::BackendConfig,
    domain::MemeRepository,
    errors::RepoError,
    models::{BidRecord, MemeField, MemeRecord, NewMeme, VoteKind},
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// In-memory store (demo mode, and the live store's fallback mirror)
// ---------------------------------------------------------------------------

/// Record store backed by a locked vector, newest-first by construction.
///
/// All mutation goes through one mutex, which gives the atomic increment
/// guarantees the contract requires at this scale.
#[derive(Debug, Default)]
pub struct InMemoryMemeStore {
    memes: Mutex<Vec<MemeRecord>>,
}

impl InMemoryMemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo-mode store pre-seeded with the five stock memes.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        {
            let mut memes = store.memes.try_lock().expect("fresh store is uncontended");
            *memes = demo_memes();
            info!("In-memory store seeded with {} demo memes", memes.len());
        }
        store
    }

    /// Replaces the whole collection, e.g. with a fresh backend snapshot.
    pub async fn replace_all(&self, records: Vec<MemeRecord>) {
        let mut memes = self.memes.lock().await;
        *memes = records;
    }

    /// Inserts or overwrites a record by id, preserving list position for
    /// updates and prepending new records.
    pub async fn upsert(&self, record: MemeRecord) {
        let mut memes = self.memes.lock().await;
        match memes.iter_mut().find(|m| m.id == record.id) {
            Some(existing) => *existing = record,
            None => memes.insert(0, record),
        }
    }
}

#[async_trait]
impl MemeRepository for InMemoryMemeStore {
    async fn list_all(&self) -> Vec<MemeRecord> {
        self.memes.lock().await.clone()
    }

    async fn create(&self, meme: NewMeme) -> Result<MemeRecord, RepoError> {
        let record = meme.into_record();
        let mut memes = self.memes.lock().await;
        memes.insert(0, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<MemeRecord, RepoError> {
        let memes = self.memes.lock().await;
        memes
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(RepoError::NotFound(id))
    }

    async fn increment_vote(&self, id: Uuid, kind: VoteKind) -> Result<u64, RepoError> {
        let mut memes = self.memes.lock().await;
        let meme = memes
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepoError::NotFound(id))?;
        let counter = match kind {
            VoteKind::Up => &mut meme.upvotes,
            VoteKind::Down => &mut meme.downvotes,
        };
        *counter += 1;
        Ok(*counter)
    }

    async fn apply_bid(
        &self,
        id: Uuid,
        credits: u64,
        user_id: &str,
    ) -> Result<BidRecord, RepoError> {
        let mut memes = self.memes.lock().await;
        let meme = memes
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepoError::NotFound(id))?;
        // Overwrite semantics: a later lower bid replaces a higher one.
        meme.highest_bid = credits;
        meme.highest_bidder = Some(user_id.to_string());
        Ok(BidRecord {
            meme_id: id,
            user_id: user_id.to_string(),
            credits,
            created_at: Utc::now(),
        })
    }

    async fn set_field(&self, id: Uuid, field: MemeField, value: &str) {
        let mut memes = self.memes.lock().await;
        match memes.iter_mut().find(|m| m.id == id) {
            Some(meme) => {
                match field {
                    MemeField::Caption => meme.caption = value.to_string(),
                    MemeField::Vibe => meme.vibe = value.to_string(),
                }
                debug!(meme_id = %id, field = field.as_str(), "Stored enriched field");
            }
            None => {
                // Enrichment raced with record lifetime; nothing to update.
                warn!(meme_id = %id, field = field.as_str(), "Enrichment target no longer exists");
            }
        }
    }
}

fn demo_memes() -> Vec<MemeRecord> {
    let seed = [
        (
            "Doge HODL",
            1,
            vec!["crypto", "funny"],
            "cyberpunk420",
            69,
            2,
            420,
            "neo_hacker",
            "Much HODL, very stonks! 🚀",
            "Neon Crypto Chaos",
        ),
        (
            "Matrix Cat",
            2,
            vec!["cat", "matrix"],
            "neo_hacker",
            42,
            1,
            300,
            "matrix_breaker",
            "I can haz red pill? 💊",
            "Digital Rebellion",
        ),
        (
            "Stonks Only Go Up",
            3,
            vec!["stonks", "moon"],
            "matrix_breaker",
            128,
            5,
            1000,
            "cyberpunk420",
            "Brrr goes the printer 📈",
            "Retro Finance Vibes",
        ),
        (
            "Glitch Pepe",
            4,
            vec!["pepe", "glitch"],
            "neon_samurai",
            84,
            3,
            666,
            "ghost_in_shell",
            "Feels glitchy man... ⚡",
            "Hack Energy",
        ),
        (
            "Cyber Shiba",
            5,
            vec!["shiba", "cyberpunk"],
            "ghost_in_shell",
            156,
            7,
            777,
            "neon_samurai",
            "Such cyber, very punk! 🌃",
            "Matrix Vibes",
        ),
    ];

    seed.into_iter()
        .map(
            |(title, img, tags, owner, up, down, bid, bidder, caption, vibe)| MemeRecord {
                id: Uuid::new_v4(),
                title: title.to_string(),
                image_url: format!("https://picsum.photos/400/300?random={}", img),
                tags: tags.into_iter().map(str::to_string).collect(),
                owner_id: owner.to_string(),
                upvotes: up,
                downvotes: down,
                highest_bid: bid,
                highest_bidder: Some(bidder.to_string()),
                caption: caption.to_string(),
                vibe: vibe.to_string(),
                created_at: Utc::now(),
            },
        )
        .collect()
}

// ---------------------------------------------------------------------------
// REST-backed store (live mode)
// ---------------------------------------------------------------------------

/// Record store backed by a PostgREST-style HTTP API (Supabase-compatible).
///
/// Every successful remote mutation is also written to an embedded in-memory
/// mirror; when the backend is unreachable the store transparently serves
/// from the mirror instead of surfacing the outage to callers.
pub struct RestMemeStore {
    client: Client,
    base_url: String,
    api_key: String,
    mirror: InMemoryMemeStore,
    /// Serializes read-modify-write vote updates within this process.
    vote_lock: Mutex<()>,
}

impl RestMemeStore {
    pub fn new(config: &BackendConfig) -> Self {
        info!(base_url = %config.base_url, "Initializing RestMemeStore");
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            mirror: InMemoryMemeStore::new(),
            vote_lock: Mutex::new(()),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
    }

    /// Bounded retry for transient backend failures.
    fn retry_policy() -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_elapsed_time: Some(Duration::from_secs(2)),
            ..ExponentialBackoff::default()
        }
    }

    /// Sends a request, retrying transient failures, and deserializes the
    /// representation rows PostgREST returns.
    async fn fetch_rows(
        &self,
        build: impl Fn() -> RequestBuilder,
    ) -> anyhow::Result<Vec<MemeRecord>> {
        let rows = backoff::future::retry(Self::retry_policy(), || async {
            let response = build()
                .send()
                .await
                .map_err(|e| backoff::Error::transient(anyhow!(e)))?;
            let status = response.status();
            if status.is_server_error() {
                return Err(backoff::Error::transient(anyhow!(
                    "backend returned {}",
                    status
                )));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(anyhow!(
                    "backend returned {}",
                    status
                )));
            }
            response
                .json::<Vec<MemeRecord>>()
                .await
                .map_err(|e| backoff::Error::permanent(anyhow!(e)))
        })
        .await?;
        Ok(rows)
    }

    async fn fetch_one(&self, id: Uuid) -> anyhow::Result<Option<MemeRecord>> {
        let path = format!("memes?id=eq.{}&select=*", id);
        let rows = self
            .fetch_rows(|| self.request(Method::GET, &path))
            .await
            .context("fetching single meme")?;
        Ok(rows.into_iter().next())
    }

    /// PATCHes a partial update and returns the updated rows.
    async fn patch_meme(&self, id: Uuid, body: serde_json::Value) -> anyhow::Result<Vec<MemeRecord>> {
        let path = format!("memes?id=eq.{}", id);
        self.fetch_rows(|| {
            self.request(Method::PATCH, &path)
                .header("Prefer", "return=representation")
                .json(&body)
        })
        .await
        .context("patching meme")
    }
}

#[async_trait]
impl MemeRepository for RestMemeStore {
    async fn list_all(&self) -> Vec<MemeRecord> {
        let result = self
            .fetch_rows(|| self.request(Method::GET, "memes?select=*&order=created_at.desc"))
            .await;
        match result {
            Ok(records) => {
                self.mirror.replace_all(records.clone()).await;
                records
            }
            Err(e) => {
                warn!(error = %e, "Backend list failed, serving in-memory mirror");
                self.mirror.list_all().await
            }
        }
    }

    async fn create(&self, meme: NewMeme) -> Result<MemeRecord, RepoError> {
        let record = meme.into_record();
        let result = self
            .fetch_rows(|| {
                self.request(Method::POST, "memes")
                    .header("Prefer", "return=representation")
                    .json(&record)
            })
            .await
            .context("inserting meme");
        match result {
            Ok(mut rows) => {
                let stored = rows.pop().unwrap_or_else(|| record.clone());
                self.mirror.upsert(stored.clone()).await;
                Ok(stored)
            }
            Err(e) => {
                warn!(error = %e, meme_id = %record.id, "Backend insert failed, keeping record in mirror only");
                self.mirror.upsert(record.clone()).await;
                Ok(record)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<MemeRecord, RepoError> {
        match self.fetch_one(id).await {
            Ok(Some(record)) => {
                self.mirror.upsert(record.clone()).await;
                Ok(record)
            }
            Ok(None) => Err(RepoError::NotFound(id)),
            Err(e) => {
                warn!(error = %e, meme_id = %id, "Backend get failed, serving in-memory mirror");
                self.mirror.get(id).await
            }
        }
    }

    async fn increment_vote(&self, id: Uuid, kind: VoteKind) -> Result<u64, RepoError> {
        // PostgREST offers no atomic increment without a stored procedure, so
        // serialize the read-modify-write within this process.
        let _guard = self.vote_lock.lock().await;
        let current = match self.fetch_one(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(RepoError::NotFound(id)),
            Err(e) => {
                warn!(error = %e, meme_id = %id, "Backend vote read failed, voting on mirror");
                return self.mirror.increment_vote(id, kind).await;
            }
        };
        let field = match kind {
            VoteKind::Up => "upvotes",
            VoteKind::Down => "downvotes",
        };
        let new_value = match kind {
            VoteKind::Up => current.upvotes + 1,
            VoteKind::Down => current.downvotes + 1,
        };
        match self.patch_meme(id, serde_json::json!({ field: new_value })).await {
            Ok(mut rows) => {
                if let Some(updated) = rows.pop() {
                    self.mirror.upsert(updated).await;
                }
                Ok(new_value)
            }
            Err(e) => {
                warn!(error = %e, meme_id = %id, "Backend vote write failed, voting on mirror");
                self.mirror.upsert(current).await;
                self.mirror.increment_vote(id, kind).await
            }
        }
    }

    async fn apply_bid(
        &self,
        id: Uuid,
        credits: u64,
        user_id: &str,
    ) -> Result<BidRecord, RepoError> {
        let bid = BidRecord {
            meme_id: id,
            user_id: user_id.to_string(),
            credits,
            created_at: Utc::now(),
        };

        // Audit log first, then the meme's highest-bid pair. A failed audit
        // insert is logged but does not block the bid.
        let audit = backoff::future::retry(Self::retry_policy(), || async {
            self.request(Method::POST, "bids")
                .json(&bid)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(anyhow!(e)))?
                .error_for_status()
                .map_err(|e| backoff::Error::permanent(anyhow!(e)))
        })
        .await;
        if let Err(e) = audit {
            warn!(error = %e, meme_id = %id, "Bid audit insert failed");
        }

        let body = serde_json::json!({
            "highest_bid": credits,
            "highest_bidder": user_id,
        });
        match self.patch_meme(id, body).await {
            Ok(mut rows) => match rows.pop() {
                Some(updated) => {
                    self.mirror.upsert(updated).await;
                    Ok(bid)
                }
                None => Err(RepoError::NotFound(id)),
            },
            Err(e) => {
                warn!(error = %e, meme_id = %id, "Backend bid write failed, bidding on mirror");
                self.mirror.apply_bid(id, credits, user_id).await
            }
        }
    }

    async fn set_field(&self, id: Uuid, field: MemeField, value: &str) {
        let body = serde_json::json!({ field.as_str(): value });
        match self.patch_meme(id, body).await {
            Ok(rows) if rows.is_empty() => {
                warn!(meme_id = %id, field = field.as_str(), "Enrichment target no longer exists");
            }
            Ok(mut rows) => {
                if let Some(updated) = rows.pop() {
                    self.mirror.upsert(updated).await;
                }
            }
            Err(e) => {
                warn!(error = %e, meme_id = %id, field = field.as_str(), "Backend field write failed, updating mirror only");
                self.mirror.set_field(id, field, value).await;
            }
        }
    }
}
