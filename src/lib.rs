//! MemeHustle: a small real-time meme marketplace.
//!
//! REST mutations flow into a pluggable record store and fan back out to
//! every connected client over a broadcast channel, including AI-derived
//! caption/vibe fields that arrive after the creation response.

pub mod client;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod leaderboard;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod startup;

pub use routes::create_router;
pub use startup::{AppState, build_demo_state, build_state};
