//! Broadcast events and the SSE fan-out channel.

use crate::models::{MemeRecord, VoteKind};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Partial record update. Receivers merge by id, overwriting only the
/// fields that are present.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MemePatch {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe: Option<String>,
}

impl MemePatch {
    pub fn caption(id: Uuid, caption: impl Into<String>) -> Self {
        Self {
            id,
            caption: Some(caption.into()),
            vibe: None,
        }
    }

    pub fn vibe(id: Uuid, vibe: impl Into<String>) -> Self {
        Self {
            id,
            caption: None,
            vibe: Some(vibe.into()),
        }
    }
}

/// Everything the server pushes to connected clients.
///
/// Each variant is idempotent-safe to replay: applying the same event twice
/// leaves a client cache in the same state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MemeEvent {
    /// A full record was created.
    NewMeme { meme: MemeRecord },
    /// One vote counter changed.
    VoteUpdate {
        meme_id: Uuid,
        vote: VoteKind,
        new_value: u64,
    },
    /// A bid was accepted; carries the updated record for convenience.
    NewBid {
        meme_id: Uuid,
        user_id: String,
        credits: u64,
        meme: MemeRecord,
    },
    /// Caption and/or vibe changed after the fact.
    MemeUpdated { patch: MemePatch },
}

impl MemeEvent {
    /// SSE event name, matching the serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            MemeEvent::NewMeme { .. } => "new_meme",
            MemeEvent::VoteUpdate { .. } => "vote_update",
            MemeEvent::NewBid { .. } => "new_bid",
            MemeEvent::MemeUpdated { .. } => "meme_updated",
        }
    }
}

/// Fan-out channel for state-change events.
///
/// Delivery is at-most-once best-effort: there is no replay for late
/// joiners, and publishing with zero subscribers is not an error.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<MemeEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("Broadcast channel initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Publishes an event to all current subscribers, fire-and-forget.
    pub fn publish(&self, event: MemeEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!("Broadcast event to {} clients", count),
            Err(_) => debug!("Broadcast event with no connected clients"),
        }
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Direct subscription, used by in-process consumers and tests.
    pub fn subscribe(&self) -> broadcast::Receiver<MemeEvent> {
        self.tx.subscribe()
    }

    /// Axum SSE response for GET /api/events. Takes the broadcaster by
    /// value (it is a cheap clone) so the stream owns its subscription.
    pub fn into_sse_response(self) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        info!(
            "New SSE client connected, total clients: {}",
            self.client_count() + 1
        );

        Sse::new(event_stream(self.tx.subscribe())).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keep-alive"),
        )
    }
}

/// Adapts a broadcast subscription into an SSE event stream.
fn event_stream(
    rx: broadcast::Receiver<MemeEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(meme_event) => {
                let event = Event::default()
                    .event(meme_event.name())
                    .json_data(&meme_event)
                    .ok();
                event.map(Ok)
            }
            Err(e) => {
                // A lagging client dropped events; it re-syncs via the
                // list endpoint on its own.
                warn!("SSE client error: {:?}", e);
                None
            }
        }
    })
}
