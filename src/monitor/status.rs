use std::fmt;
use std::time::Duration;

use super::mapper::{format_delta, format_score, match_url};
use super::state::MatchState;

/// How polling is going, independent of the match itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Health {
    #[default]
    Starting,
    Ok,
    Disabled,
    /// The configured nickname does not exist on the platform
    PlayerNotFound,
    /// Consecutive transient failures, polling slowed down
    Degraded { failures: u32 },
    RateLimited { retry_after: Duration },
}

/// What the monitor is showing, for a tray or any other observer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonitorStatus {
    pub nickname: String,
    pub state: MatchState,
    pub health: Health,
}

impl MonitorStatus {
    /// Link to the match currently displayed, if any
    pub fn match_url(&self) -> Option<String> {
        self.state.meta().map(match_url)
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.health {
            Health::Starting => return write!(f, "Starting"),
            Health::Disabled => return write!(f, "Disabled"),
            Health::PlayerNotFound => return write!(f, "Player {} not found", self.nickname),
            Health::Ok | Health::Degraded { .. } | Health::RateLimited { .. } => {}
        }

        let map = self
            .state
            .meta()
            .and_then(|m| m.map.as_deref())
            .unwrap_or("unknown map");

        match &self.state {
            MatchState::NoMatch => write!(f, "No active match")?,
            MatchState::Lobby { .. } => write!(f, "In lobby: {}", map)?,
            MatchState::Live { score, .. } => write!(f, "Live: {} ({})", map, format_score(*score))?,
            MatchState::Finished {
                result, elo_delta, ..
            } => {
                write!(f, "Finished: {} - {}", map, result.label())?;
                if let Some(delta) = elo_delta {
                    write!(f, " ({} ELO)", format_delta(*delta))?;
                }
            }
        }

        match &self.health {
            Health::Degraded { failures } => write!(f, " [API errors: {}]", failures),
            Health::RateLimited { retry_after } => {
                write!(f, " [rate limited for {}s]", retry_after.as_secs())
            }
            _ => Ok(()),
        }
    }
}
