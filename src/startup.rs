use crate::{
    config::Config,
    domain::{MemeRepository, TextProvider},
    enrichment::{EnrichmentService, GeminiProvider},
    events::Broadcaster,
    leaderboard::LeaderboardCache,
    repositories::{InMemoryMemeStore, RestMemeStore},
};
use std::sync::Arc;
use tracing::info;

/// Events buffered per subscriber before a slow client starts lagging.
const BROADCAST_CAPACITY: usize = 100;

/// Shared resources for the web server. Constructed once at startup and
/// handed to every handler behind an `Arc`.
pub struct AppState {
    pub store: Arc<dyn MemeRepository>,
    pub enrichment: EnrichmentService,
    pub leaderboard: LeaderboardCache,
    pub broadcaster: Broadcaster,
    pub demo_mode: bool,
}

/// Selects backends from configuration and assembles the application state.
///
/// Demo mode (missing/placeholder credentials) runs a seeded in-memory
/// store with fallback-only enrichment and no leaderboard caching; live
/// mode runs the REST store, the Gemini provider and the 30-second
/// leaderboard cache.
pub fn build_state(config: &Config) -> Arc<AppState> {
    let demo_mode = config.demo_mode();
    info!("Starting MemeHustle in {} mode", config.mode_label());

    let store: Arc<dyn MemeRepository> = match (&config.backend, demo_mode) {
        (Some(backend), false) => Arc::new(RestMemeStore::new(backend)),
        _ => Arc::new(InMemoryMemeStore::with_demo_data()),
    };

    let provider: Option<Arc<dyn TextProvider>> = match (&config.gemini_api_key, demo_mode) {
        (Some(key), false) => Some(Arc::new(GeminiProvider::new(key.clone()))),
        _ => None,
    };
    let enrichment = EnrichmentService::new(provider);

    // The in-memory store recomputes cheaply, so the cache only runs in
    // live mode.
    let leaderboard = LeaderboardCache::with_default_ttl(!demo_mode);

    Arc::new(AppState {
        store,
        enrichment,
        leaderboard,
        broadcaster: Broadcaster::new(BROADCAST_CAPACITY),
        demo_mode,
    })
}

/// Demo-mode state over a caller-supplied store; used by integration tests
/// to start from a known collection.
pub fn build_demo_state(store: Arc<dyn MemeRepository>) -> Arc<AppState> {
    Arc::new(AppState {
        store,
        enrichment: EnrichmentService::new(None),
        leaderboard: LeaderboardCache::with_default_ttl(false),
        broadcaster: Broadcaster::new(BROADCAST_CAPACITY),
        demo_mode: true,
    })
}
