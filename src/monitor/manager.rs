//! Owns the monitor context and runs one decision cycle at a time

use std::sync::Arc;
use std::time::Duration;

use crate::faceit::{FaceitError, MatchQuery, MatchSource, Player, PollResult};
use crate::presence::{PresenceError, PresencePayload, PresencePublisher};
use crate::settings::{Settings, SettingsProvider};

use super::backoff::Backoff;
use super::mapper::build_payload;
use super::state::{MatchState, Observation, StateMachine};
use super::status::{Health, MonitorStatus};

/// Knobs that are not user settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTuning {
    /// Backoff never exceeds this multiple of the poll interval
    pub backoff_cap_factor: u32,
    /// Consecutive transient failures before they are reported
    pub failure_tolerance: u32,
    /// Cycles a finished match is followed while its rating change is unknown
    pub delta_backfill_cycles: u32,
}

impl Default for MonitorTuning {
    fn default() -> Self {
        Self {
            backoff_cap_factor: 4,
            failure_tolerance: 5,
            delta_backfill_cycles: 3,
        }
    }
}

/// When the next cycle should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPoll {
    /// This long after the start of the cycle that just ran
    Interval(Duration),
    /// This long from now, regardless of the regular schedule
    Suspend(Duration),
}

/// What a cycle did to the displayed presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceAction {
    None,
    Published,
    Cleared,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub next: NextPoll,
    pub presence: PresenceAction,
}

impl CycleReport {
    fn wait(delay: Duration) -> Self {
        Self {
            next: NextPoll::Interval(delay),
            presence: PresenceAction::None,
        }
    }
}

/// Last thing the publisher accepted
#[derive(Debug, Clone, PartialEq, Eq)]
enum Published {
    Cleared,
    Shown(PresencePayload),
}

/// The match state monitor.
///
/// All state lives here and is only changed through `&mut self`, so at most one
/// cycle can run at a time.
pub struct Monitor {
    source: Arc<dyn MatchSource>,
    publisher: Arc<dyn PresencePublisher>,
    settings: Arc<dyn SettingsProvider>,
    tuning: MonitorTuning,
    nickname: String,
    player: Option<Player>,
    machine: StateMachine,
    backoff: Backoff,
    health: Health,
    published: Published,
    /// Cycles that ended in `Finished` for the current match
    finished_cycles: u32,
    /// When the current match was first seen (unix seconds)
    tracked_since: i64,
}

impl Monitor {
    pub fn new(
        nickname: impl Into<String>,
        source: Arc<dyn MatchSource>,
        publisher: Arc<dyn PresencePublisher>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let tuning = MonitorTuning::default();
        let base = settings.snapshot().poll_interval();
        Self {
            source,
            publisher,
            settings,
            tuning,
            nickname: nickname.into(),
            player: None,
            machine: StateMachine::new(),
            backoff: Backoff::new(base, tuning.backoff_cap_factor),
            health: Health::Starting,
            published: Published::Cleared,
            finished_cycles: 0,
            tracked_since: now_unix(),
        }
    }

    pub fn with_tuning(mut self, tuning: MonitorTuning) -> Self {
        self.tuning = tuning;
        self.backoff = Backoff::new(self.backoff.base(), tuning.backoff_cap_factor);
        self
    }

    /// Skip the lookup when the player was already resolved at startup
    pub fn with_player(mut self, player: Player) -> Self {
        self.player = Some(player);
        self
    }

    pub fn state(&self) -> &MatchState {
        self.machine.current()
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            nickname: self.nickname.clone(),
            state: self.machine.current().clone(),
            health: self.health.clone(),
        }
    }

    /// Track someone else. Match state and backoff start over.
    pub fn change_player(&mut self, nickname: impl Into<String>) {
        let nickname = nickname.into();
        tracing::info!("Switching player from {} to {}", self.nickname, nickname);
        self.nickname = nickname;
        self.player = None;
        self.reset_match();
        self.backoff.reset();
        self.health = Health::Starting;
    }

    /// Explicitly remove the displayed presence
    pub async fn clear_presence(&mut self) -> Result<(), PresenceError> {
        self.publisher.clear().await?;
        self.published = Published::Cleared;
        tracing::debug!("Cleared presence on {}", self.publisher.name());
        Ok(())
    }

    fn reset_match(&mut self) {
        self.machine.reset();
        self.finished_cycles = 0;
    }

    /// Run one decision cycle: poll, fold the result into the state machine and
    /// push the presence if what should be displayed changed.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let settings = self.settings.snapshot();
        self.backoff.set_base(settings.poll_interval());

        if !settings.enabled {
            if self.health != Health::Disabled {
                tracing::info!("Rich presence disabled, polling paused");
            }
            self.health = Health::Disabled;
            self.reset_match();
            return CycleReport::wait(settings.poll_interval());
        }

        let player = match self.ensure_player().await {
            Ok(player) => player,
            Err(report) => return report,
        };

        let query = self.query(&settings);
        let facts = match self.source.current_match(&player, &query).await {
            PollResult::Success(facts) => Some(facts),
            PollResult::NotFound => None,
            PollResult::RateLimited(retry_after) => return self.rate_limited(retry_after),
            PollResult::TransientError(err) => return self.transient_failure(&err),
        };
        self.recovered();

        let previous_id = self.machine.current().match_id().map(str::to_string);
        let was_finished = matches!(self.machine.current(), MatchState::Finished { .. });

        let observation = facts
            .as_ref()
            .map_or(Observation::NoActiveMatch, Observation::Match);
        let kind = self.machine.apply(observation);

        let current = self.machine.current();
        let same_match = current.match_id().map(str::to_string) == previous_id;
        if current.match_id().is_some() && !same_match {
            self.tracked_since = now_unix();
        }
        self.finished_cycles = match current {
            MatchState::Finished { .. } if was_finished && same_match => {
                self.finished_cycles.saturating_add(1)
            }
            MatchState::Finished { .. } => 1,
            _ => 0,
        };

        tracing::debug!("Cycle result: {:?}, now {}", kind, self.machine.current().name());

        let presence = self.sync_presence(&settings).await;

        CycleReport {
            next: NextPoll::Interval(self.backoff.delay()),
            presence,
        }
    }

    async fn ensure_player(&mut self) -> Result<Player, CycleReport> {
        if let Some(player) = &self.player {
            return Ok(player.clone());
        }

        match self.source.lookup_player(&self.nickname).await {
            Ok(Some(player)) => {
                tracing::info!(
                    "Found player: {} (ELO: {})",
                    player.nickname,
                    player.elo.map_or_else(|| "unknown".to_string(), |e| e.to_string())
                );
                self.player = Some(player.clone());
                Ok(player)
            }
            Ok(None) => {
                if self.health != Health::PlayerNotFound {
                    tracing::warn!("Player {} not found on FACEIT", self.nickname);
                }
                self.health = Health::PlayerNotFound;
                self.backoff.record_failure();
                Err(CycleReport::wait(self.backoff.delay()))
            }
            Err(FaceitError::RateLimited(retry_after)) => Err(self.rate_limited(retry_after)),
            Err(e) => Err(self.transient_failure(&e.to_string())),
        }
    }

    fn query(&self, settings: &Settings) -> MatchQuery {
        let follow = match self.machine.current() {
            MatchState::NoMatch => None,
            MatchState::Lobby { meta, .. } | MatchState::Live { meta, .. } => {
                Some(meta.match_id.clone())
            }
            MatchState::Finished {
                meta, elo_delta, ..
            } => {
                let awaiting_delta = settings.show_elo
                    && elo_delta.is_none()
                    && self.finished_cycles <= self.tuning.delta_backfill_cycles;
                let holding = self.finished_cycles <= settings.finished_hold_cycles;
                (awaiting_delta || holding).then(|| meta.match_id.clone())
            }
        };

        MatchQuery {
            follow,
            with_kda: settings.show_kda,
            with_elo_delta: settings.show_elo,
        }
    }

    /// Pause for what the server asked, but never less than one poll interval
    fn rate_limited(&mut self, retry_after: Duration) -> CycleReport {
        let retry_after = retry_after.max(self.backoff.base());
        tracing::warn!(
            "FACEIT rate limit hit, pausing polling for {}s",
            retry_after.as_secs()
        );
        self.health = Health::RateLimited { retry_after };
        CycleReport {
            next: NextPoll::Suspend(retry_after),
            presence: PresenceAction::None,
        }
    }

    fn transient_failure(&mut self, err: &str) -> CycleReport {
        let failures = self.backoff.record_failure();
        let delay = self.backoff.delay();
        let tolerance = self.tuning.failure_tolerance;

        if failures < tolerance {
            tracing::debug!("FACEIT poll failed ({}), retrying in {}s", err, delay.as_secs());
        } else {
            if failures == tolerance {
                tracing::error!(
                    "FACEIT API failed {} times in a row, still retrying: {}",
                    failures,
                    err
                );
            } else {
                tracing::warn!("FACEIT poll failed again ({}): {}", failures, err);
            }
            self.health = Health::Degraded { failures };
        }

        CycleReport::wait(delay)
    }

    fn recovered(&mut self) {
        if self.backoff.failures() >= self.tuning.failure_tolerance {
            tracing::info!(
                "FACEIT API recovered after {} failed polls",
                self.backoff.failures()
            );
        }
        self.backoff.reset();
        self.health = Health::Ok;
    }

    async fn sync_presence(&mut self, settings: &Settings) -> PresenceAction {
        let desired = build_payload(self.machine.current(), settings, self.tracked_since);

        let unchanged = match (&desired, &self.published) {
            (None, Published::Cleared) => true,
            (Some(payload), Published::Shown(shown)) => payload == shown,
            _ => false,
        };
        if unchanged {
            return PresenceAction::None;
        }

        match desired {
            None => match self.publisher.clear().await {
                Ok(()) => {
                    tracing::debug!("Cleared presence on {}", self.publisher.name());
                    self.published = Published::Cleared;
                    PresenceAction::Cleared
                }
                Err(e) => {
                    tracing::warn!("Failed to clear presence on {}: {}", self.publisher.name(), e);
                    PresenceAction::Failed
                }
            },
            Some(payload) => match self.publisher.publish(&payload).await {
                Ok(()) => {
                    tracing::debug!("Updated presence: {} | {}", payload.details, payload.state);
                    self.published = Published::Shown(payload);
                    PresenceAction::Published
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to update presence on {}: {}",
                        self.publisher.name(),
                        e
                    );
                    PresenceAction::Failed
                }
            },
        }
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faceit::MatchPhase;
    use crate::monitor::testing::{
        finished, live, lobby, RecordingPublisher, ScriptedSource, TEST_MATCH,
    };
    use crate::settings::MemorySettings;

    struct Harness {
        source: Arc<ScriptedSource>,
        publisher: Arc<RecordingPublisher>,
        settings: Arc<MemorySettings>,
        monitor: Monitor,
    }

    fn harness(results: Vec<PollResult>) -> Harness {
        harness_with(results, Settings::default())
    }

    fn harness_with(results: Vec<PollResult>, settings: Settings) -> Harness {
        let source = Arc::new(ScriptedSource::new(results));
        let publisher = Arc::new(RecordingPublisher::default());
        let settings = Arc::new(MemorySettings::new(settings));
        let monitor = Monitor::new(
            "player1",
            Arc::clone(&source) as Arc<dyn MatchSource>,
            Arc::clone(&publisher) as Arc<dyn PresencePublisher>,
            Arc::clone(&settings) as Arc<dyn SettingsProvider>,
        );
        Harness {
            source,
            publisher,
            settings,
            monitor,
        }
    }

    const BASE: Duration = Duration::from_secs(45);

    #[tokio::test]
    async fn test_full_match_scenario() {
        let mut h = harness(vec![
            PollResult::Success(lobby("de_mirage", 2150)),
            PollResult::Success(live(0, 0)),
            PollResult::Success(live(8, 5)),
            PollResult::Success(finished(12, 8, None)),
            PollResult::Success(finished(12, 8, Some(25))),
            PollResult::NotFound,
        ]);

        for _ in 0..6 {
            let report = h.monitor.run_cycle().await;
            assert_eq!(report.next, NextPoll::Interval(BASE));
        }

        assert_eq!(h.publisher.publish_count(), 5);
        assert_eq!(h.publisher.clear_count(), 1);
        assert_eq!(*h.monitor.state(), MatchState::NoMatch);

        let published = h.publisher.published();
        assert_eq!(published.first().map(|p| p.details.as_str()), Some("In Lobby - de_mirage"));
        assert_eq!(published.last().map(|p| p.state.as_str()), Some("12 - 8 | ELO: +25"));

        // The finished match was followed while its delta was unknown, then let go
        let queries = h.source.queries();
        assert_eq!(queries.get(4).and_then(|q| q.follow.as_deref()), Some(TEST_MATCH));
        assert_eq!(queries.get(5).and_then(|q| q.follow.clone()), None);

        // Still no match: nothing more to clear
        h.monitor.run_cycle().await;
        assert_eq!(h.publisher.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_same_snapshot_publishes_once() {
        let mut h = harness(vec![
            PollResult::Success(live(3, 2)),
            PollResult::Success(live(3, 2)),
            PollResult::Success(live(3, 2)),
        ]);

        let first = h.monitor.run_cycle().await;
        let second = h.monitor.run_cycle().await;
        h.monitor.run_cycle().await;

        assert_eq!(first.presence, PresenceAction::Published);
        assert_eq!(second.presence, PresenceAction::None);
        assert_eq!(h.publisher.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_hidden_field_change_is_not_published() {
        let mut with_kda = live(3, 2);
        with_kda.kda = Some(crate::faceit::Kda {
            kills: 7,
            deaths: 2,
            assists: 1,
        });
        let settings = Settings {
            show_kda: false,
            ..Settings::default()
        };
        let mut h = harness_with(
            vec![
                PollResult::Success(live(3, 2)),
                PollResult::Success(with_kda),
                PollResult::Success(live(4, 2)),
            ],
            settings,
        );

        h.monitor.run_cycle().await;
        h.monitor.run_cycle().await;
        assert_eq!(h.publisher.publish_count(), 1);

        h.monitor.run_cycle().await;
        assert_eq!(h.publisher.publish_count(), 2);
        assert!(!h.source.queries().iter().any(|q| q.with_kda));
    }

    #[tokio::test]
    async fn test_transient_errors_back_off_without_touching_state() {
        let mut h = harness(vec![
            PollResult::Success(lobby("de_inferno", 1800)),
            PollResult::TransientError("503".to_string()),
            PollResult::TransientError("503".to_string()),
            PollResult::TransientError("timeout".to_string()),
            PollResult::TransientError("timeout".to_string()),
            PollResult::Success(lobby("de_inferno", 1800)),
        ]);
        h.monitor.run_cycle().await;
        let before = h.monitor.state().clone();

        let delays: Vec<NextPoll> = {
            let mut delays = Vec::new();
            for _ in 0..4 {
                delays.push(h.monitor.run_cycle().await.next);
            }
            delays
        };
        assert_eq!(
            delays,
            vec![
                NextPoll::Interval(Duration::from_secs(90)),
                NextPoll::Interval(Duration::from_secs(180)),
                NextPoll::Interval(Duration::from_secs(180)),
                NextPoll::Interval(Duration::from_secs(180)),
            ]
        );
        assert_eq!(*h.monitor.state(), before);
        assert_eq!(h.publisher.publish_count(), 1);
        assert_eq!(h.publisher.clear_count(), 0);

        assert_eq!(h.monitor.run_cycle().await.next, NextPoll::Interval(BASE));
        assert_eq!(h.monitor.status().health, Health::Ok);
    }

    #[tokio::test]
    async fn test_failures_reported_after_tolerance() {
        let mut h = harness(vec![PollResult::TransientError("down".to_string()); 6]);
        let tolerance = MonitorTuning::default().failure_tolerance;

        for _ in 1..tolerance {
            h.monitor.run_cycle().await;
        }
        assert!(!matches!(h.monitor.status().health, Health::Degraded { .. }));

        h.monitor.run_cycle().await;
        assert_eq!(
            h.monitor.status().health,
            Health::Degraded {
                failures: tolerance
            }
        );
    }

    #[tokio::test]
    async fn test_live_without_stats_shows_no_kda() {
        let mut h = harness(vec![PollResult::Success(live(8, 5))]);
        h.monitor.run_cycle().await;

        let published = h.publisher.published();
        let state_line = published.last().map(|p| p.state.clone()).unwrap_or_default();
        assert_eq!(state_line, "Playing");
        assert!(!state_line.contains("K/D/A"));
    }

    #[tokio::test]
    async fn test_zero_retry_after_waits_one_interval() {
        let mut h = harness(vec![PollResult::RateLimited(Duration::ZERO)]);

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.next, NextPoll::Suspend(BASE));
        assert_eq!(
            h.monitor.status().health,
            Health::RateLimited { retry_after: BASE }
        );
    }

    #[tokio::test]
    async fn test_custom_backoff_cap() {
        let mut h = harness(vec![PollResult::TransientError("down".to_string()); 3]);
        h.monitor = h.monitor.with_tuning(MonitorTuning {
            backoff_cap_factor: 2,
            failure_tolerance: 2,
            ..MonitorTuning::default()
        });

        let mut delays = Vec::new();
        for _ in 0..3 {
            delays.push(h.monitor.run_cycle().await.next);
        }
        assert_eq!(
            delays,
            vec![NextPoll::Interval(BASE * 2); 3]
        );
        assert_eq!(h.monitor.status().health, Health::Degraded { failures: 3 });
    }

    #[tokio::test]
    async fn test_new_lobby_replaces_finished_match_without_clear() {
        let mut next_lobby = lobby("de_anubis", 1900);
        next_lobby.match_id = "1-7d3e0a41".to_string();
        let mut h = harness(vec![
            PollResult::Success(live(12, 10)),
            PollResult::Success(finished(13, 10, Some(22))),
            PollResult::Success(next_lobby),
        ]);

        for _ in 0..3 {
            h.monitor.run_cycle().await;
        }

        // The held match is dropped internally; the new lobby overwrites it
        assert_eq!(h.publisher.publish_count(), 3);
        assert_eq!(h.publisher.clear_count(), 0);
        let published = h.publisher.published();
        assert_eq!(
            published.last().map(|p| p.details.as_str()),
            Some("In Lobby - de_anubis")
        );
        assert_eq!(
            published.last().map(|p| p.button.url.as_str()),
            Some("https://www.faceit.com/en/cs2/room/1-7d3e0a41")
        );
        assert_eq!(h.monitor.state().match_id(), Some("1-7d3e0a41"));
    }

    #[tokio::test]
    async fn test_rate_limit_suspends_without_touching_state() {
        let mut h = harness(vec![
            PollResult::Success(live(1, 0)),
            PollResult::RateLimited(Duration::from_secs(300)),
            PollResult::Success(live(1, 0)),
        ]);
        h.monitor.run_cycle().await;
        let before = h.monitor.state().clone();

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.next, NextPoll::Suspend(Duration::from_secs(300)));
        assert_eq!(*h.monitor.state(), before);
        assert_eq!(
            h.monitor.status().health,
            Health::RateLimited {
                retry_after: Duration::from_secs(300)
            }
        );

        // Rate limiting does not count as a failure
        assert_eq!(h.monitor.run_cycle().await.next, NextPoll::Interval(BASE));
        assert_eq!(h.publisher.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_is_retried_next_cycle() {
        let mut h = harness(vec![
            PollResult::Success(live(5, 5)),
            PollResult::Success(live(5, 5)),
            PollResult::Success(live(5, 5)),
        ]);
        h.publisher.set_failing(true);

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.presence, PresenceAction::Failed);
        assert_eq!(report.next, NextPoll::Interval(BASE));
        assert_eq!(h.monitor.state().phase(), Some(MatchPhase::Live));

        h.publisher.set_failing(false);
        assert_eq!(h.monitor.run_cycle().await.presence, PresenceAction::Published);
        assert_eq!(h.monitor.run_cycle().await.presence, PresenceAction::None);
        assert_eq!(h.publisher.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_pauses_polling_without_clearing() {
        let mut h = harness(vec![PollResult::Success(live(2, 2)), PollResult::NotFound]);
        h.monitor.run_cycle().await;
        assert_eq!(h.source.poll_count(), 1);

        h.settings.update(|s| s.enabled = false);
        let report = h.monitor.run_cycle().await;

        assert_eq!(report.next, NextPoll::Interval(BASE));
        assert_eq!(h.source.poll_count(), 1);
        assert_eq!(*h.monitor.state(), MatchState::NoMatch);
        assert_eq!(h.publisher.clear_count(), 0);
        assert_eq!(h.monitor.status().health, Health::Disabled);

        // Clearing is an explicit action
        h.monitor.clear_presence().await.unwrap();
        assert_eq!(h.publisher.clear_count(), 1);

        h.settings.update(|s| s.enabled = true);
        h.monitor.run_cycle().await;
        assert_eq!(h.source.poll_count(), 2);
        assert_eq!(h.publisher.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_poll_interval_change_applies_next_cycle() {
        let mut h = harness(vec![PollResult::NotFound, PollResult::NotFound]);
        assert_eq!(h.monitor.run_cycle().await.next, NextPoll::Interval(BASE));

        h.settings.update(|s| s.poll_interval_secs = 20);
        assert_eq!(
            h.monitor.run_cycle().await.next,
            NextPoll::Interval(Duration::from_secs(20))
        );
    }

    #[tokio::test]
    async fn test_change_player_resets_state_and_backoff() {
        let mut h = harness(vec![
            PollResult::Success(live(9, 9)),
            PollResult::TransientError("boom".to_string()),
            PollResult::NotFound,
        ]);
        h.monitor.run_cycle().await;
        h.monitor.run_cycle().await;
        assert_eq!(h.source.lookup_count(), 1);

        h.monitor.change_player("player2");
        assert_eq!(*h.monitor.state(), MatchState::NoMatch);
        assert_eq!(h.monitor.nickname(), "player2");

        let report = h.monitor.run_cycle().await;
        assert_eq!(report.next, NextPoll::Interval(BASE));
        assert_eq!(h.source.lookup_count(), 2);
        // The old match's presence goes away
        assert_eq!(h.publisher.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_player_backs_off() {
        let source = Arc::new(ScriptedSource::without_player());
        let publisher = Arc::new(RecordingPublisher::default());
        let mut monitor = Monitor::new(
            "ghost",
            Arc::clone(&source) as Arc<dyn MatchSource>,
            publisher as Arc<dyn PresencePublisher>,
            Arc::new(MemorySettings::default()) as Arc<dyn SettingsProvider>,
        );

        let report = monitor.run_cycle().await;
        assert_eq!(report.next, NextPoll::Interval(Duration::from_secs(90)));
        assert_eq!(monitor.status().health, Health::PlayerNotFound);
        assert_eq!(source.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_delta_backfill_gives_up() {
        let mut results = vec![PollResult::Success(live(13, 11))];
        results.extend(vec![PollResult::Success(finished(13, 11, None)); 5]);
        let mut h = harness(results);

        for _ in 0..6 {
            h.monitor.run_cycle().await;
        }

        let follows: Vec<bool> = h
            .source
            .queries()
            .iter()
            .map(|q| q.follow.is_some())
            .collect();
        // live, finished #1..#3 still waiting for the delta, then let go
        assert_eq!(follows, vec![false, true, true, true, true, false]);
        assert_eq!(h.publisher.publish_count(), 2);
    }

    #[tokio::test]
    async fn test_finished_hold_cycles() {
        let settings = Settings {
            finished_hold_cycles: 2,
            ..Settings::default()
        };
        let mut h = harness_with(
            vec![
                PollResult::Success(live(13, 3)),
                PollResult::Success(finished(13, 3, Some(30))),
                PollResult::Success(finished(13, 3, Some(30))),
                PollResult::Success(finished(13, 3, Some(30))),
                PollResult::NotFound,
            ],
            settings,
        );

        for _ in 0..5 {
            h.monitor.run_cycle().await;
        }

        let follows: Vec<bool> = h
            .source
            .queries()
            .iter()
            .map(|q| q.follow.is_some())
            .collect();
        assert_eq!(follows, vec![false, true, true, true, false]);
        assert_eq!(h.publisher.publish_count(), 2);
        assert_eq!(h.publisher.clear_count(), 1);
    }
}
