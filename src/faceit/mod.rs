//! FACEIT platform access: player lookup and current-match polling

mod client;
mod error;
mod models;
mod types;

use async_trait::async_trait;

pub use client::FaceitClient;
pub use error::FaceitError;
pub use types::{Kda, MatchFacts, MatchPhase, MatchQuery, MatchResult, Player, PollResult, Score};

/// Source of match information for the monitor
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Resolve a nickname. `Ok(None)` means no such player exists.
    async fn lookup_player(&self, nickname: &str) -> Result<Option<Player>, FaceitError>;

    /// Ask what the player is doing right now
    async fn current_match(&self, player: &Player, query: &MatchQuery) -> PollResult;
}
