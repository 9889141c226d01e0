use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed identity pool; owners and bidders are drawn from here at random.
/// There is no real authentication in this system.
pub const MOCK_USERS: [&str; 5] = [
    "cyberpunk420",
    "neo_hacker",
    "matrix_breaker",
    "neon_samurai",
    "ghost_in_shell",
];

const IMAGE_THEMES: [&str; 5] = ["cat", "dog", "tech", "space", "cyberpunk"];

/// A single meme as stored and broadcast. Flat JSON on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemeRecord {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub owner_id: String,
    pub upvotes: u64,
    pub downvotes: u64,
    pub highest_bid: u64,
    pub highest_bidder: Option<String>,
    pub caption: String,
    pub vibe: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit entry for an accepted bid (live mode only).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidRecord {
    pub meme_id: Uuid,
    pub user_id: String,
    pub credits: u64,
    pub created_at: DateTime<Utc>,
}

/// Validated creation input with all defaults already applied.
#[derive(Debug, Clone)]
pub struct NewMeme {
    pub title: String,
    pub image_url: String,
    pub tags: Vec<String>,
}

impl NewMeme {
    /// Applies the creation defaults: a generated placeholder image when none
    /// was supplied, and the standard fallback tag pair when tags are empty.
    pub fn with_defaults(
        title: String,
        image_url: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Self {
        let image_url = match image_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => random_meme_image(),
        };
        let tags = match tags {
            Some(tags) if !tags.is_empty() => tags,
            _ => vec!["meme".to_string(), "crypto".to_string()],
        };
        Self {
            title,
            image_url,
            tags,
        }
    }

    /// Materializes a full record: fresh id, random owner, zeroed counters,
    /// empty caption/vibe pending enrichment.
    pub fn into_record(self) -> MemeRecord {
        MemeRecord {
            id: Uuid::new_v4(),
            title: self.title,
            image_url: self.image_url,
            tags: self.tags,
            owner_id: random_mock_user(),
            upvotes: 0,
            downvotes: 0,
            highest_bid: 0,
            highest_bidder: None,
            caption: String::new(),
            vibe: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Which vote counter an up/down vote targets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(VoteKind::Up),
            "down" => Some(VoteKind::Down),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Up => "up",
            VoteKind::Down => "down",
        }
    }
}

/// The two asynchronously enriched text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemeField {
    Caption,
    Vibe,
}

impl MemeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemeField::Caption => "caption",
            MemeField::Vibe => "vibe",
        }
    }
}

/// Picks an identity from the fixed pool.
pub fn random_mock_user() -> String {
    let mut rng = rand::thread_rng();
    MOCK_USERS
        .choose(&mut rng)
        .expect("identity pool is non-empty")
        .to_string()
}

/// Generates a placeholder image URL seeded by the current timestamp so that
/// two creations without a supplied image stay distinguishable.
pub fn random_meme_image() -> String {
    let mut rng = rand::thread_rng();
    let theme = IMAGE_THEMES
        .choose(&mut rng)
        .expect("theme pool is non-empty");
    format!(
        "https://picsum.photos/400/300?random={}&{}",
        Utc::now().timestamp_millis(),
        theme
    )
}

// --- Request / response payloads ---

#[derive(Deserialize, Debug)]
pub struct CreateMemeRequest {
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
pub struct VoteRequest {
    /// "up" or "down"; kept as a raw string so an invalid value maps to a
    /// 400 instead of a body-deserialization rejection.
    #[serde(rename = "type")]
    pub vote_type: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct BidRequest {
    pub credits: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct BidResponse {
    pub meme_id: Uuid,
    pub user_id: String,
    pub credits: u64,
}

#[derive(Serialize, Debug)]
pub struct CaptionResponse {
    pub caption: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct LeaderboardQuery {
    pub top: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_fill_image_and_tags() {
        let meme = NewMeme::with_defaults("Doge".to_string(), None, None);
        assert!(meme.image_url.starts_with("https://picsum.photos/"));
        assert_eq!(meme.tags, vec!["meme", "crypto"]);
    }

    #[test]
    fn create_defaults_keep_supplied_values() {
        let meme = NewMeme::with_defaults(
            "Doge".to_string(),
            Some("https://example.com/doge.png".to_string()),
            Some(vec!["doge".to_string()]),
        );
        assert_eq!(meme.image_url, "https://example.com/doge.png");
        assert_eq!(meme.tags, vec!["doge"]);
    }

    #[test]
    fn new_record_starts_zeroed() {
        let record = NewMeme::with_defaults("Doge".to_string(), None, None).into_record();
        assert_eq!(record.upvotes, 0);
        assert_eq!(record.downvotes, 0);
        assert_eq!(record.highest_bid, 0);
        assert_eq!(record.highest_bidder, None);
        assert!(record.caption.is_empty());
        assert!(record.vibe.is_empty());
        assert!(MOCK_USERS.contains(&record.owner_id.as_str()));
    }

    #[test]
    fn vote_kind_parses_only_up_and_down() {
        assert_eq!(VoteKind::parse("up"), Some(VoteKind::Up));
        assert_eq!(VoteKind::parse("down"), Some(VoteKind::Down));
        assert_eq!(VoteKind::parse("sideways"), None);
        assert_eq!(VoteKind::parse(""), None);
    }
}
