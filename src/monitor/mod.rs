//! Match state monitor: polls the platform, tracks the match and keeps the
//! chat presence in sync with it

mod backoff;
mod manager;
mod mapper;
mod state;
mod status;
mod task;

#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use manager::{CycleReport, Monitor, MonitorTuning, NextPoll, PresenceAction};
pub use mapper::{build_payload, format_delta, format_kda, format_score, format_thousands, match_url};
pub use state::{MatchMeta, MatchState, Observation, StateMachine, TransitionKind};
pub use status::{Health, MonitorStatus};
pub use task::{spawn_monitor, MonitorHandle};
