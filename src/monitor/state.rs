//! The match state machine.
//!
//! Forward order is `NoMatch → Lobby → Live → Finished → NoMatch`. Polls can skip
//! a step when a phase is shorter than the poll interval, so forward skips are
//! accepted. Facts that would move the same match backwards are stale and
//! ignored. Facts about a different match drop the held match first, so a
//! finished match never turns straight into a new lobby.

use crate::faceit::{Kda, MatchFacts, MatchPhase, MatchResult, Score};

/// Identity of the match being displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMeta {
    pub match_id: String,
    pub map: Option<String>,
    pub room_url: Option<String>,
    /// Unix timestamp (seconds)
    pub started_at: Option<i64>,
}

impl MatchMeta {
    fn from_facts(facts: &MatchFacts) -> Self {
        Self {
            match_id: facts.match_id.clone(),
            map: facts.map.clone(),
            room_url: facts.room_url.clone(),
            started_at: facts.started_at,
        }
    }

    /// Fill in fields the new facts did not report from what we already knew
    fn merged(&self, facts: &MatchFacts) -> Self {
        Self {
            match_id: facts.match_id.clone(),
            map: facts.map.clone().or_else(|| self.map.clone()),
            room_url: facts.room_url.clone().or_else(|| self.room_url.clone()),
            started_at: facts.started_at.or(self.started_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchState {
    #[default]
    NoMatch,
    Lobby {
        meta: MatchMeta,
        avg_elo: Option<u32>,
    },
    Live {
        meta: MatchMeta,
        score: Score,
        /// `None` until the platform reports stats for the player
        kda: Option<Kda>,
        avg_elo: Option<u32>,
    },
    Finished {
        meta: MatchMeta,
        result: MatchResult,
        score: Score,
        elo_delta: Option<i32>,
    },
}

impl MatchState {
    pub fn meta(&self) -> Option<&MatchMeta> {
        match self {
            Self::NoMatch => None,
            Self::Lobby { meta, .. } | Self::Live { meta, .. } | Self::Finished { meta, .. } => {
                Some(meta)
            }
        }
    }

    pub fn match_id(&self) -> Option<&str> {
        self.meta().map(|m| m.match_id.as_str())
    }

    pub fn phase(&self) -> Option<MatchPhase> {
        match self {
            Self::NoMatch => None,
            Self::Lobby { .. } => Some(MatchPhase::Lobby),
            Self::Live { .. } => Some(MatchPhase::Live),
            Self::Finished { .. } => Some(MatchPhase::Finished),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoMatch => "no match",
            Self::Lobby { .. } => "lobby",
            Self::Live { .. } => "live",
            Self::Finished { .. } => "finished",
        }
    }
}

/// What one poll told us about the player
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    NoActiveMatch,
    Match(&'a MatchFacts),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Same state, same content
    Unchanged,
    /// Same state, some field changed
    Updated,
    /// Moved forward to another phase of the same match
    Advanced,
    /// Back to `NoMatch`
    Cleared,
    /// A different match replaced the held one, passing through `NoMatch`
    Replaced,
    /// The facts were older than what we hold and were ignored
    Stale,
}

impl TransitionKind {
    /// Whether the state content changed
    pub fn changed(self) -> bool {
        !matches!(self, Self::Unchanged | Self::Stale)
    }
}

/// Single owner of the current [`MatchState`]
#[derive(Debug, Default)]
pub struct StateMachine {
    current: MatchState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &MatchState {
        &self.current
    }

    pub fn reset(&mut self) {
        self.current = MatchState::NoMatch;
    }

    pub fn apply(&mut self, observation: Observation<'_>) -> TransitionKind {
        let facts = match observation {
            Observation::NoActiveMatch => {
                if self.current == MatchState::NoMatch {
                    return TransitionKind::Unchanged;
                }
                tracing::info!(
                    "Match {} is over ({})",
                    self.current.match_id().unwrap_or_default(),
                    self.current.name()
                );
                self.reset();
                return TransitionKind::Cleared;
            }
            Observation::Match(facts) => facts,
        };

        let replacing = self
            .current
            .match_id()
            .is_some_and(|held| held != facts.match_id);

        if replacing {
            tracing::info!(
                "Match {} replaced by {}",
                self.current.match_id().unwrap_or_default(),
                facts.match_id
            );
            self.reset();
            return match advance(&self.current, facts) {
                Some(next) => {
                    self.current = next;
                    TransitionKind::Replaced
                }
                None => TransitionKind::Cleared,
            };
        }

        let Some(next) = advance(&self.current, facts) else {
            tracing::debug!(
                "Ignoring {:?} facts for match {} while {}",
                facts.phase,
                facts.match_id,
                self.current.name()
            );
            return TransitionKind::Stale;
        };

        let kind = if next == self.current {
            TransitionKind::Unchanged
        } else if next.phase() == self.current.phase() {
            TransitionKind::Updated
        } else {
            tracing::info!(
                "Match {}: {} -> {}",
                facts.match_id,
                self.current.name(),
                next.name()
            );
            TransitionKind::Advanced
        };

        self.current = next;
        kind
    }
}

/// Next state for facts about the held match (or any match from `NoMatch`).
/// `None` means the facts do not move the state.
fn advance(current: &MatchState, facts: &MatchFacts) -> Option<MatchState> {
    use MatchState as S;

    let meta = match current.meta() {
        Some(held) => held.merged(facts),
        None => MatchMeta::from_facts(facts),
    };

    match (current, facts.phase) {
        // A finished match we never saw being played is not announced
        (S::NoMatch, MatchPhase::Finished) => None,

        (S::NoMatch, MatchPhase::Lobby) => Some(S::Lobby {
            meta,
            avg_elo: facts.avg_elo,
        }),
        (S::Lobby { avg_elo, .. }, MatchPhase::Lobby) => Some(S::Lobby {
            meta,
            avg_elo: facts.avg_elo.or(*avg_elo),
        }),

        (S::NoMatch, MatchPhase::Live) => Some(S::Live {
            meta,
            score: facts.score.unwrap_or_default(),
            kda: facts.kda,
            avg_elo: facts.avg_elo,
        }),
        (S::Lobby { avg_elo, .. }, MatchPhase::Live) => Some(S::Live {
            meta,
            score: facts.score.unwrap_or_default(),
            kda: facts.kda,
            avg_elo: facts.avg_elo.or(*avg_elo),
        }),
        (
            S::Live {
                score,
                kda,
                avg_elo,
                ..
            },
            MatchPhase::Live,
        ) => Some(S::Live {
            meta,
            score: facts.score.unwrap_or(*score),
            kda: facts.kda.or(*kda),
            avg_elo: facts.avg_elo.or(*avg_elo),
        }),

        (S::Lobby { .. }, MatchPhase::Finished) => {
            let score = facts.score.unwrap_or_default();
            Some(S::Finished {
                meta,
                result: facts.result.unwrap_or_else(|| MatchResult::from_score(score)),
                score,
                elo_delta: facts.elo_delta,
            })
        }
        (S::Live { score, .. }, MatchPhase::Finished) => {
            let score = facts.score.unwrap_or(*score);
            Some(S::Finished {
                meta,
                result: facts.result.unwrap_or_else(|| MatchResult::from_score(score)),
                score,
                elo_delta: facts.elo_delta,
            })
        }
        (
            S::Finished {
                result,
                score,
                elo_delta,
                ..
            },
            MatchPhase::Finished,
        ) => Some(S::Finished {
            meta,
            result: facts.result.unwrap_or(*result),
            score: facts.score.unwrap_or(*score),
            // Once known, the delta never becomes unknown again
            elo_delta: facts.elo_delta.or(*elo_delta),
        }),

        (S::Live { .. }, MatchPhase::Lobby) | (S::Finished { .. }, MatchPhase::Lobby | MatchPhase::Live) => {
            None
        }
    }
}
