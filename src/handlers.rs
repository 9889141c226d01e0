use crate::{
    errors::AppError,
    events::{MemeEvent, MemePatch},
    leaderboard::DEFAULT_TOP,
    models::{
        BidRequest, BidResponse, CaptionResponse, CreateMemeRequest, LeaderboardQuery, MemeField,
        MemeRecord, NewMeme, VoteKind, VoteRequest, random_mock_user,
    },
    startup::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/memes — full listing, newest-first. Never fails.
pub async fn list_memes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let memes = state.store.list_all().await;
    tracing::debug!("Listing {} memes", memes.len());
    Json(memes)
}

/// POST /api/memes — creates a record, broadcasts it, and schedules the two
/// enrichment continuations without blocking the response.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::MissingField("title".to_string()))?;

    let meme = state
        .store
        .create(NewMeme::with_defaults(title, request.image_url, request.tags))
        .await?;

    state
        .broadcaster
        .publish(MemeEvent::NewMeme { meme: meme.clone() });

    // Caption and vibe arrive independently, in either order, each through
    // its own meme_updated broadcast.
    spawn_enrichment(Arc::clone(&state), meme.clone(), MemeField::Caption);
    spawn_enrichment(Arc::clone(&state), meme.clone(), MemeField::Vibe);

    tracing::info!(meme_id = %meme.id, "Meme created");
    Ok((StatusCode::CREATED, Json(meme)))
}

/// Runs one enrichment continuation to completion: generate, persist,
/// broadcast. Failures inside never reach the creation request.
fn spawn_enrichment(state: Arc<AppState>, meme: MemeRecord, field: MemeField) {
    tokio::spawn(async move {
        let text = state
            .enrichment
            .generate(field, &meme.title, &meme.tags)
            .await;
        state.store.set_field(meme.id, field, &text).await;
        let patch = match field {
            MemeField::Caption => MemePatch::caption(meme.id, text),
            MemeField::Vibe => MemePatch::vibe(meme.id, text),
        };
        state
            .broadcaster
            .publish(MemeEvent::MemeUpdated { patch });
    });
}

/// POST /api/memes/{id}/vote — bumps one counter, invalidates the
/// leaderboard, broadcasts the new value.
pub async fn vote_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(request): Json<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let kind = request
        .vote_type
        .as_deref()
        .and_then(VoteKind::parse)
        .ok_or_else(|| AppError::InvalidInput("vote type must be 'up' or 'down'".to_string()))?;

    let new_value = state.store.increment_vote(meme_id, kind).await?;
    state.leaderboard.invalidate().await;

    state.broadcaster.publish(MemeEvent::VoteUpdate {
        meme_id,
        vote: kind,
        new_value,
    });

    tracing::debug!(%meme_id, vote = kind.as_str(), new_value, "Vote accepted");
    Ok(Json(serde_json::json!({
        "meme_id": meme_id,
        "vote": kind,
        "new_value": new_value,
    })))
}

/// POST /api/memes/{id}/bid — unconditional overwrite of the highest bid.
pub async fn bid_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(request): Json<BidRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let credits = match request.credits {
        Some(credits) if credits > 0 => credits as u64,
        _ => {
            return Err(AppError::InvalidInput(
                "credits must be a positive integer".to_string(),
            ));
        }
    };

    let user_id = random_mock_user();
    let bid = state.store.apply_bid(meme_id, credits, &user_id).await?;
    let meme = state.store.get(meme_id).await?;

    state.broadcaster.publish(MemeEvent::NewBid {
        meme_id,
        user_id: bid.user_id.clone(),
        credits: bid.credits,
        meme,
    });

    tracing::debug!(%meme_id, user_id = %bid.user_id, credits, "Bid accepted");
    Ok(Json(BidResponse {
        meme_id,
        user_id: bid.user_id,
        credits: bid.credits,
    }))
}

/// GET /api/leaderboard?top=N — top-N by upvotes, default 10.
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let n = query.top.unwrap_or(DEFAULT_TOP);
    let ranked = state.leaderboard.top(&state.store, n).await;
    Json(ranked)
}

/// POST /api/memes/{id}/caption — synchronous caption regeneration.
///
/// Regeneration overwrites an existing caption but, because enrichment is
/// total, never resets it to empty.
pub async fn regenerate_caption(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let meme = state.store.get(meme_id).await?;

    let caption = state
        .enrichment
        .generate(MemeField::Caption, &meme.title, &meme.tags)
        .await;
    state
        .store
        .set_field(meme_id, MemeField::Caption, &caption)
        .await;

    state.broadcaster.publish(MemeEvent::MemeUpdated {
        patch: MemePatch::caption(meme_id, caption.clone()),
    });

    Ok(Json(CaptionResponse { caption }))
}

/// GET /api/health — liveness and mode descriptor.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "mode": if state.demo_mode { "DEMO" } else { "LIVE" },
        "timestamp": Utc::now(),
        "database": if state.demo_mode { "in-memory" } else { "connected" },
        "enrichment": if state.enrichment.has_provider() { "connected" } else { "fallback" },
        "clients": state.broadcaster.client_count(),
    }))
}

#[derive(Deserialize, Debug, Default)]
pub struct EventsQuery {
    /// Room scoping is accepted but not load-bearing; every client receives
    /// every event.
    pub room: Option<String>,
}

/// GET /api/events — SSE subscription to the broadcast channel.
pub async fn subscribe_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    if let Some(room) = &query.room {
        tracing::info!(room = %room, "Client joined room");
    }
    state.broadcaster.clone().into_sse_response()
}
