//! Client-side reconciliation of broadcast events.
//!
//! A connected client seeds its cache from `GET /api/memes` and then applies
//! every broadcast event in arrival order. No optimistic local mutation:
//! even the acting client waits for its own mutation to come back over the
//! broadcast channel.

use crate::events::{MemeEvent, MemePatch};
use crate::models::{MemeRecord, VoteKind};
use uuid::Uuid;

/// Local ordered cache of meme records, converging on the server state.
#[derive(Debug, Default)]
pub struct MemeFeed {
    memes: Vec<MemeRecord>,
}

impl MemeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with a fresh listing (initial load or re-sync
    /// after a disconnect).
    pub fn seed(&mut self, memes: Vec<MemeRecord>) {
        self.memes = memes;
    }

    pub fn memes(&self) -> &[MemeRecord] {
        &self.memes
    }

    pub fn get(&self, id: Uuid) -> Option<&MemeRecord> {
        self.memes.iter().find(|m| m.id == id)
    }

    /// Applies one broadcast event.
    ///
    /// Events for ids not cached locally are dropped; the record surfaces on
    /// the next full re-sync. Replaying an event is harmless.
    pub fn apply(&mut self, event: &MemeEvent) {
        match event {
            MemeEvent::NewMeme { meme } => {
                if self.get(meme.id).is_none() {
                    self.memes.insert(0, meme.clone());
                }
            }
            MemeEvent::VoteUpdate {
                meme_id,
                vote,
                new_value,
            } => {
                if let Some(meme) = self.memes.iter_mut().find(|m| m.id == *meme_id) {
                    match vote {
                        VoteKind::Up => meme.upvotes = *new_value,
                        VoteKind::Down => meme.downvotes = *new_value,
                    }
                }
            }
            MemeEvent::NewBid { meme_id, meme, .. } => {
                if let Some(cached) = self.memes.iter_mut().find(|m| m.id == *meme_id) {
                    *cached = meme.clone();
                }
            }
            MemeEvent::MemeUpdated { patch } => self.merge_patch(patch),
        }
    }

    fn merge_patch(&mut self, patch: &MemePatch) {
        let Some(meme) = self.memes.iter_mut().find(|m| m.id == patch.id) else {
            return;
        };
        if let Some(caption) = &patch.caption {
            meme.caption = caption.clone();
        }
        if let Some(vibe) = &patch.vibe {
            meme.vibe = vibe.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMeme;

    fn record(title: &str) -> MemeRecord {
        NewMeme::with_defaults(title.to_string(), None, None).into_record()
    }

    #[test]
    fn new_meme_prepends_once() {
        let mut feed = MemeFeed::new();
        feed.seed(vec![record("old")]);

        let fresh = record("fresh");
        let event = MemeEvent::NewMeme { meme: fresh.clone() };
        feed.apply(&event);
        feed.apply(&event); // replay is a no-op

        assert_eq!(feed.memes().len(), 2);
        assert_eq!(feed.memes()[0].id, fresh.id);
    }

    #[test]
    fn vote_update_sets_the_named_counter() {
        let mut feed = MemeFeed::new();
        let meme = record("votable");
        feed.seed(vec![meme.clone()]);

        feed.apply(&MemeEvent::VoteUpdate {
            meme_id: meme.id,
            vote: VoteKind::Up,
            new_value: 7,
        });

        let cached = feed.get(meme.id).unwrap();
        assert_eq!(cached.upvotes, 7);
        assert_eq!(cached.downvotes, 0);
    }

    #[test]
    fn events_for_unknown_ids_are_dropped() {
        let mut feed = MemeFeed::new();
        feed.seed(vec![record("only")]);
        let before = feed.memes().to_vec();

        feed.apply(&MemeEvent::VoteUpdate {
            meme_id: Uuid::new_v4(),
            vote: VoteKind::Down,
            new_value: 3,
        });
        feed.apply(&MemeEvent::MemeUpdated {
            patch: MemePatch::caption(Uuid::new_v4(), "ghost"),
        });

        assert_eq!(feed.memes(), before.as_slice());
    }

    #[test]
    fn bid_replaces_the_cached_record() {
        let mut feed = MemeFeed::new();
        let meme = record("biddable");
        feed.seed(vec![meme.clone()]);

        let mut updated = meme.clone();
        updated.highest_bid = 99;
        updated.highest_bidder = Some("neo_hacker".to_string());
        feed.apply(&MemeEvent::NewBid {
            meme_id: meme.id,
            user_id: "neo_hacker".to_string(),
            credits: 99,
            meme: updated,
        });

        let cached = feed.get(meme.id).unwrap();
        assert_eq!(cached.highest_bid, 99);
        assert_eq!(cached.highest_bidder.as_deref(), Some("neo_hacker"));
    }

    #[test]
    fn patches_merge_in_any_order() {
        let mut feed = MemeFeed::new();
        let meme = record("enrichable");
        feed.seed(vec![meme.clone()]);

        // Vibe may land before caption.
        feed.apply(&MemeEvent::MemeUpdated {
            patch: MemePatch::vibe(meme.id, "Neon Chaos"),
        });
        feed.apply(&MemeEvent::MemeUpdated {
            patch: MemePatch::caption(meme.id, "Hack the planet!"),
        });

        let cached = feed.get(meme.id).unwrap();
        assert_eq!(cached.vibe, "Neon Chaos");
        assert_eq!(cached.caption, "Hack the planet!");
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut feed = MemeFeed::new();
        let mut meme = record("partial");
        meme.caption = "existing caption".to_string();
        feed.seed(vec![meme.clone()]);

        feed.apply(&MemeEvent::MemeUpdated {
            patch: MemePatch::vibe(meme.id, "Cyber Stonks"),
        });

        let cached = feed.get(meme.id).unwrap();
        assert_eq!(cached.caption, "existing caption");
        assert_eq!(cached.vibe, "Cyber Stonks");
    }
}
