//! In-memory collaborators for monitor tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::faceit::{
    FaceitError, MatchFacts, MatchPhase, MatchQuery, MatchSource, Player, PollResult, Score,
};
use crate::presence::{PresenceError, PresencePayload, PresencePublisher};

pub const TEST_MATCH: &str = "1-0f4c2b9e";

pub fn lobby(map: &str, avg_elo: u32) -> MatchFacts {
    let mut facts = MatchFacts::new(TEST_MATCH, MatchPhase::Lobby);
    facts.map = Some(map.to_string());
    facts.avg_elo = Some(avg_elo);
    facts
}

pub fn live(home: u32, away: u32) -> MatchFacts {
    let mut facts = MatchFacts::new(TEST_MATCH, MatchPhase::Live);
    facts.score = Some(Score::new(home, away));
    facts
}

pub fn finished(home: u32, away: u32, elo_delta: Option<i32>) -> MatchFacts {
    let mut facts = MatchFacts::new(TEST_MATCH, MatchPhase::Finished);
    facts.score = Some(Score::new(home, away));
    facts.elo_delta = elo_delta;
    facts
}

/// Answers polls from a script, then reports no match
pub struct ScriptedSource {
    player: Option<Player>,
    results: Mutex<VecDeque<PollResult>>,
    queries: Mutex<Vec<MatchQuery>>,
    lookups: AtomicUsize,
    poll_delay: Duration,
}

impl ScriptedSource {
    pub fn new(results: Vec<PollResult>) -> Self {
        Self {
            player: Some(Player {
                id: "9f1a7d2c".to_string(),
                nickname: "player1".to_string(),
                elo: Some(2100),
                skill_level: Some(10),
            }),
            results: Mutex::new(results.into()),
            queries: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
            poll_delay: Duration::ZERO,
        }
    }

    pub fn without_player() -> Self {
        Self {
            player: None,
            ..Self::new(Vec::new())
        }
    }

    /// Every poll takes this long to answer
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn queries(&self) -> Vec<MatchQuery> {
        self.queries.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.queries.lock().len()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchSource for ScriptedSource {
    async fn lookup_player(&self, _nickname: &str) -> Result<Option<Player>, FaceitError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.player.clone())
    }

    async fn current_match(&self, _player: &Player, query: &MatchQuery) -> PollResult {
        self.queries.lock().push(query.clone());
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        self.results.lock().pop_front().unwrap_or(PollResult::NotFound)
    }
}

/// Remembers every accepted publish and clear
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PresencePayload>>,
    clears: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PresencePayload> {
        self.published.lock().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PresencePublisher for RecordingPublisher {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, payload: &PresencePayload) -> Result<(), PresenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PresenceError::NotConnected);
        }
        self.published.lock().push(payload.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), PresenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PresenceError::NotConnected);
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
