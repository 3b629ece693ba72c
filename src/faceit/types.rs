use std::time::Duration;

/// A FACEIT player resolved from a nickname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub nickname: String,
    pub elo: Option<u32>,
    pub skill_level: Option<u32>,
}

/// Where a match is in its lifecycle, as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Check-in, map voting or server configuration
    Lobby,
    Live,
    Finished,
}

/// Round score with the tracked player's team first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Kda {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Victory,
    Defeat,
    Draw,
}

impl MatchResult {
    pub fn from_score(score: Score) -> Self {
        match score.home.cmp(&score.away) {
            std::cmp::Ordering::Greater => Self::Victory,
            std::cmp::Ordering::Less => Self::Defeat,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Victory => "Victory",
            Self::Defeat => "Defeat",
            Self::Draw => "Draw",
        }
    }
}

/// Snapshot of one match as seen by a single poll.
///
/// Optional fields are `None` when the platform has not reported them yet
/// (or when they were not requested).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFacts {
    pub match_id: String,
    pub phase: MatchPhase,
    pub map: Option<String>,
    pub room_url: Option<String>,
    /// Unix timestamp (seconds)
    pub started_at: Option<i64>,
    pub avg_elo: Option<u32>,
    pub score: Option<Score>,
    pub kda: Option<Kda>,
    pub result: Option<MatchResult>,
    pub elo_delta: Option<i32>,
}

impl MatchFacts {
    pub fn new(match_id: impl Into<String>, phase: MatchPhase) -> Self {
        Self {
            match_id: match_id.into(),
            phase,
            map: None,
            room_url: None,
            started_at: None,
            avg_elo: None,
            score: None,
            kda: None,
            result: None,
            elo_delta: None,
        }
    }
}

/// Outcome of one poll of the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Success(MatchFacts),
    /// The server asked us to back off for this long
    RateLimited(Duration),
    /// Network failure, 5xx, timeout or an unreadable body
    TransientError(String),
    /// The player has no active match
    NotFound,
}

/// What the monitor wants from a poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchQuery {
    /// A match the monitor is still tracking. It is fetched directly when the
    /// player has no ongoing match, so its finish can be observed.
    pub follow: Option<String>,
    pub with_kda: bool,
    pub with_elo_delta: bool,
}
