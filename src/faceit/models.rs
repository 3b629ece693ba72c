//! Wire types for the FACEIT Data API v4 and their conversion into match facts.
//!
//! The API is loose about numeric types (stats arrive as strings, timestamps as
//! either unix seconds or RFC 3339), so those fields are read as raw JSON values.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::types::{Kda, MatchFacts, MatchPhase, MatchResult, Player, Score};

pub const GAME_ID: &str = "cs2";

const FACTION_1: &str = "faction1";
const FACTION_2: &str = "faction2";

/// Statuses of a match that has not started yet
const LOBBY_STATUSES: &[&str] = &[
    "READY",
    "VOTING",
    "CONFIGURING",
    "CHECK_IN",
    "SUBSTITUTION",
    "CAPTAIN_PICK",
];
const LIVE_STATUS: &str = "ONGOING";
const FINISHED_STATUS: &str = "FINISHED";

pub fn phase_from_status(status: &str) -> Option<MatchPhase> {
    if LOBBY_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(status)) {
        Some(MatchPhase::Lobby)
    } else if status.eq_ignore_ascii_case(LIVE_STATUS) {
        Some(MatchPhase::Live)
    } else if status.eq_ignore_ascii_case(FINISHED_STATUS) {
        Some(MatchPhase::Finished)
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayerResponse {
    pub player_id: String,
    pub nickname: String,
    #[serde(default)]
    pub games: HashMap<String, PlayerGame>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerGame {
    #[serde(default)]
    pub faceit_elo: Option<u32>,
    #[serde(default)]
    pub skill_level: Option<u32>,
}

impl From<PlayerResponse> for Player {
    fn from(response: PlayerResponse) -> Self {
        let game = response.games.get(GAME_ID);
        Player {
            id: response.player_id,
            nickname: response.nickname,
            elo: game.and_then(|g| g.faceit_elo),
            skill_level: game.and_then(|g| g.skill_level),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryItem {
    pub match_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub elo: Option<Value>,
}

impl HistoryResponse {
    /// The first match in the history that has not finished yet
    pub fn ongoing_match_id(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|item| {
                matches!(
                    phase_from_status(&item.status),
                    Some(MatchPhase::Lobby | MatchPhase::Live)
                )
            })
            .map(|item| item.match_id.as_str())
    }

    /// Rating change caused by `match_id`: its recorded elo minus the elo
    /// recorded for the match played just before it.
    pub fn elo_delta(&self, match_id: &str) -> Option<i32> {
        let mut rest = self.items.iter().skip_while(|item| item.match_id != match_id);
        let current = rest.next()?.elo.as_ref().and_then(lenient_i64)?;
        let previous = rest.next()?.elo.as_ref().and_then(lenient_i64)?;
        current
            .checked_sub(previous)
            .and_then(|delta| i32::try_from(delta).ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchResponse {
    pub match_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub voting: Option<Voting>,
    #[serde(default)]
    pub teams: HashMap<String, Faction>,
    #[serde(default)]
    pub results: Option<MatchResults>,
    #[serde(default)]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub faceit_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Voting {
    #[serde(default)]
    pub map: Option<VotingEntity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VotingEntity {
    #[serde(default)]
    pub pick: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Faction {
    #[serde(default)]
    pub roster: Vec<RosterPlayer>,
}

#[derive(Debug, Deserialize)]
pub struct RosterPlayer {
    pub player_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub elo: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchResults {
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub score: HashMap<String, Value>,
}

impl MatchResponse {
    fn player_faction(&self, player_id: &str) -> &'static str {
        let on_second = self
            .teams
            .get(FACTION_2)
            .is_some_and(|f| f.roster.iter().any(|p| p.player_id == player_id));
        if on_second {
            FACTION_2
        } else {
            FACTION_1
        }
    }

    fn average_elo(&self) -> Option<u32> {
        let elos: Vec<u64> = self
            .teams
            .values()
            .flat_map(|f| f.roster.iter())
            .filter_map(|p| p.elo.as_ref().and_then(lenient_i64))
            .filter_map(|elo| u64::try_from(elo).ok())
            .filter(|elo| *elo > 0)
            .collect();

        let count = u64::try_from(elos.len()).ok().filter(|n| *n > 0)?;
        let total: u64 = elos.iter().sum();
        u32::try_from(total.checked_div(count)?).ok()
    }

    fn faction_score(&self, faction: &str) -> Option<u32> {
        self.results
            .as_ref()?
            .score
            .get(faction)
            .and_then(lenient_i64)
            .and_then(|s| u32::try_from(s).ok())
    }

    /// Convert into facts from the point of view of `player_id`.
    ///
    /// Returns `None` for cancelled, aborted or unrecognised matches.
    pub fn into_facts(self, player_id: &str) -> Option<MatchFacts> {
        let Some(phase) = phase_from_status(&self.status) else {
            tracing::debug!("Ignoring match {} with status {}", self.match_id, self.status);
            return None;
        };

        let home = self.player_faction(player_id);
        let away = if home == FACTION_1 { FACTION_2 } else { FACTION_1 };

        let score = match (self.faction_score(home), self.faction_score(away)) {
            (Some(h), Some(a)) => Some(Score::new(h, a)),
            (None, None) => None,
            (h, a) => Some(Score::new(h.unwrap_or(0), a.unwrap_or(0))),
        };

        let result = if phase == MatchPhase::Finished {
            let winner = self.results.as_ref().and_then(|r| r.winner.as_deref());
            match winner {
                Some(w) if w == home => Some(MatchResult::Victory),
                Some(w) if w == away => Some(MatchResult::Defeat),
                _ => score.map(MatchResult::from_score),
            }
        } else {
            None
        };

        let map = self
            .voting
            .as_ref()
            .and_then(|v| v.map.as_ref())
            .and_then(|m| m.pick.first())
            .filter(|m| !m.is_empty())
            .cloned();

        let room_url = self
            .faceit_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| u.replace("{lang}", "en"));

        let avg_elo = self.average_elo();
        let started_at = self.started_at.as_ref().and_then(parse_timestamp);

        Some(MatchFacts {
            match_id: self.match_id,
            phase,
            map,
            room_url,
            started_at,
            avg_elo,
            score,
            kda: None,
            result,
            elo_delta: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub rounds: Vec<StatsRound>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsRound {
    #[serde(default)]
    pub teams: Vec<StatsTeam>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsTeam {
    #[serde(default)]
    pub players: Vec<StatsPlayer>,
}

#[derive(Debug, Deserialize)]
pub struct StatsPlayer {
    pub player_id: String,
    #[serde(default)]
    pub player_stats: HashMap<String, Value>,
}

impl StatsResponse {
    pub fn kda_for(&self, player_id: &str) -> Option<Kda> {
        let player = self
            .rounds
            .iter()
            .flat_map(|r| r.teams.iter())
            .flat_map(|t| t.players.iter())
            .find(|p| p.player_id == player_id)?;

        let stat = |name: &str| {
            player
                .player_stats
                .get(name)
                .and_then(lenient_i64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };

        Some(Kda {
            kills: stat("Kills"),
            deaths: stat("Deaths"),
            assists: stat("Assists"),
        })
    }
}

/// Read an integer that may be encoded as a JSON number or a numeric string
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.split_once('.')
                    .and_then(|(whole, _)| whole.parse::<i64>().ok())
            })
        }
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .ok()
            .or_else(|| s.parse().ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_json(status: &str) -> String {
        format!(
            r#"{{
                "match_id": "1-abc",
                "status": "{status}",
                "faceit_url": "https://www.faceit.com/{{lang}}/cs2/room/1-abc",
                "started_at": 1700000000,
                "voting": {{ "map": {{ "pick": ["de_mirage"] }} }},
                "teams": {{
                    "faction1": {{ "roster": [
                        {{ "player_id": "p1", "nickname": "alpha", "elo": 2100 }},
                        {{ "player_id": "p2", "nickname": "bravo", "elo": 2200 }}
                    ] }},
                    "faction2": {{ "roster": [
                        {{ "player_id": "me", "nickname": "me", "elo": "2150" }},
                        {{ "player_id": "p4", "nickname": "delta", "elo": 2150 }}
                    ] }}
                }},
                "results": {{ "winner": "faction2", "score": {{ "faction1": 8, "faction2": 13 }} }}
            }}"#
        )
    }

    fn parse(status: &str) -> MatchResponse {
        serde_json::from_str(&match_json(status)).unwrap()
    }

    #[test]
    fn test_phase_from_status() {
        assert_eq!(phase_from_status("READY"), Some(MatchPhase::Lobby));
        assert_eq!(phase_from_status("voting"), Some(MatchPhase::Lobby));
        assert_eq!(phase_from_status("ONGOING"), Some(MatchPhase::Live));
        assert_eq!(phase_from_status("FINISHED"), Some(MatchPhase::Finished));
        assert_eq!(phase_from_status("CANCELLED"), None);
        assert_eq!(phase_from_status(""), None);
    }

    #[test]
    fn test_match_facts_from_players_side() {
        let facts = parse("ONGOING").into_facts("me").unwrap();

        assert_eq!(facts.phase, MatchPhase::Live);
        assert_eq!(facts.map.as_deref(), Some("de_mirage"));
        assert_eq!(facts.score, Some(Score::new(13, 8)));
        assert_eq!(facts.avg_elo, Some(2150));
        assert_eq!(facts.started_at, Some(1_700_000_000));
        assert_eq!(
            facts.room_url.as_deref(),
            Some("https://www.faceit.com/en/cs2/room/1-abc")
        );
        assert_eq!(facts.result, None);
    }

    #[test]
    fn test_finished_match_uses_winner() {
        let facts = parse("FINISHED").into_facts("me").unwrap();
        assert_eq!(facts.result, Some(MatchResult::Victory));

        let facts = parse("FINISHED").into_facts("p1").unwrap();
        assert_eq!(facts.score, Some(Score::new(8, 13)));
        assert_eq!(facts.result, Some(MatchResult::Defeat));
    }

    #[test]
    fn test_cancelled_match_has_no_facts() {
        assert!(parse("CANCELLED").into_facts("me").is_none());
    }

    #[test]
    fn test_lobby_without_results_or_map() {
        let response: MatchResponse = serde_json::from_str(
            r#"{ "match_id": "1-x", "status": "VOTING", "started_at": "2024-05-01T12:00:00Z" }"#,
        )
        .unwrap();
        let facts = response.into_facts("me").unwrap();

        assert_eq!(facts.phase, MatchPhase::Lobby);
        assert_eq!(facts.map, None);
        assert_eq!(facts.score, None);
        assert_eq!(facts.avg_elo, None);
        assert_eq!(facts.room_url, None);
        assert_eq!(facts.started_at, Some(1_714_564_800));
    }

    #[test]
    fn test_history_ongoing_and_delta() {
        let history: HistoryResponse = serde_json::from_str(
            r#"{ "items": [
                { "match_id": "m3", "status": "ONGOING" },
                { "match_id": "m2", "status": "finished", "elo": 2175 },
                { "match_id": "m1", "status": "finished", "elo": "2150" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(history.ongoing_match_id(), Some("m3"));
        assert_eq!(history.elo_delta("m2"), Some(25));
        assert_eq!(history.elo_delta("m1"), None);
        assert_eq!(history.elo_delta("m3"), None);
        assert_eq!(history.elo_delta("missing"), None);
    }

    #[test]
    fn test_stats_kda() {
        let stats: StatsResponse = serde_json::from_str(
            r#"{ "rounds": [ { "teams": [
                { "players": [ { "player_id": "other", "player_stats": { "Kills": "3" } } ] },
                { "players": [ { "player_id": "me", "player_stats": {
                    "Kills": "15", "Deaths": "8", "Assists": "3", "ADR": "91.2"
                } } ] }
            ] } ] }"#,
        )
        .unwrap();

        assert_eq!(
            stats.kda_for("me"),
            Some(Kda {
                kills: 15,
                deaths: 8,
                assists: 3
            })
        );
        assert_eq!(stats.kda_for("nobody"), None);
    }

    #[test]
    fn test_player_response() {
        let response: PlayerResponse = serde_json::from_str(
            r#"{ "player_id": "abc", "nickname": "s1mple",
                 "games": { "cs2": { "faceit_elo": 3500, "skill_level": 10 } } }"#,
        )
        .unwrap();
        let player = Player::from(response);

        assert_eq!(player.id, "abc");
        assert_eq!(player.elo, Some(3500));
        assert_eq!(player.skill_level, Some(10));
    }
}
