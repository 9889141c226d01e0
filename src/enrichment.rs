use crate::domain::TextProvider;
use crate::models::MemeField;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const FALLBACK_CAPTIONS: [&str; 7] = [
    "YOLO to the moon! 🚀",
    "HODL the vibes! 💎",
    "Brrr goes stonks 📈",
    "Hack the planet! 💀",
    "Neural link activated ⚡",
    "Glitch in the matrix 🔴",
    "Vibe check: PASSED ✅",
];

const FALLBACK_VIBES: [&str; 5] = [
    "Neon Chaos",
    "Cyber Stonks",
    "Matrix Vibes",
    "Digital Rebellion",
    "Hack Energy",
];

/// Hard ceiling on a single provider call; a slow provider degrades to
/// fallback text instead of stalling the enrichment pipeline.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces caption and vibe text for memes.
///
/// Total: every request resolves to a string. Provider absence, errors,
/// timeouts and empty responses all land on a fallback pool. Results are
/// memoized by (kind, title, tags) for the process lifetime, fallbacks
/// included, so repeated failures stay cheap and stable within a session.
pub struct EnrichmentService {
    provider: Option<Arc<dyn TextProvider>>,
    cache: Mutex<HashMap<(MemeField, String), String>>,
}

impl EnrichmentService {
    pub fn new(provider: Option<Arc<dyn TextProvider>>) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Generates text for the given meme, never failing.
    pub async fn generate(&self, kind: MemeField, title: &str, tags: &[String]) -> String {
        let cache_key = (kind, format!("{}_{}", tags.join("_"), title));

        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&cache_key) {
                debug!(?kind, title, "Enrichment cache hit");
                return cached.clone();
            }
        }

        let value = match &self.provider {
            Some(provider) => {
                let prompt = build_prompt(kind, title, tags);
                match tokio::time::timeout(PROVIDER_TIMEOUT, provider.generate_text(&prompt)).await
                {
                    Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
                    Ok(Ok(_)) => {
                        warn!(?kind, title, "Provider returned empty text, using fallback");
                        fallback_for(kind)
                    }
                    Ok(Err(e)) => {
                        warn!(?kind, title, error = %e, "Provider failed, using fallback");
                        fallback_for(kind)
                    }
                    Err(_) => {
                        warn!(?kind, title, "Provider timed out, using fallback");
                        fallback_for(kind)
                    }
                }
            }
            None => fallback_for(kind),
        };

        let mut cache = self.cache.lock().await;
        cache.entry(cache_key).or_insert_with(|| value.clone());
        value
    }
}

/// Advisory length caps live in the prompt only; responses are not truncated.
fn build_prompt(kind: MemeField, title: &str, tags: &[String]) -> String {
    let tags = tags.join(", ");
    match kind {
        MemeField::Caption => format!(
            "Generate a funny, cyberpunk-style caption for a meme with title \"{}\" and tags: {}. \
             Make it edgy and internet culture. Max 50 characters.",
            title, tags
        ),
        MemeField::Vibe => format!(
            "Describe the vibe/aesthetic of a meme with title \"{}\" and tags: {}. \
             Use cyberpunk language. Examples: \"Neon Crypto Chaos\", \"Retro Stonks Vibes\", \
             \"Matrix Glitch Energy\". Max 25 characters.",
            title, tags
        ),
    }
}

fn fallback_for(kind: MemeField) -> String {
    let mut rng = rand::thread_rng();
    let pool: &[&str] = match kind {
        MemeField::Caption => &FALLBACK_CAPTIONS,
        MemeField::Vibe => &FALLBACK_VIBES,
    };
    pool.choose(&mut rng)
        .expect("fallback pool is non-empty")
        .to_string()
}

// ---------------------------------------------------------------------------
// Gemini-style HTTP provider
// ---------------------------------------------------------------------------

const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Text provider backed by the Gemini generateContent REST API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response: serde_json::Value = self
            .client
            .post(GEMINI_ENDPOINT)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("sending generateContent request")?
            .error_for_status()
            .context("generateContent status")?
            .json()
            .await
            .context("decoding generateContent response")?;

        let text = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("malformed generateContent response"))?;
        Ok(text.to_string())
    }
}
