//! Turns a [`MatchState`] and the display settings into a presence payload

use crate::faceit::{Kda, Score};
use crate::presence::{PresenceButton, PresencePayload};
use crate::settings::Settings;

use super::state::{MatchMeta, MatchState};

const LARGE_IMAGE: &str = "faceit_logo";
const LARGE_TEXT: &str = "FACEIT CS2";
const BUTTON_LABEL: &str = "View Match";
const ROOM_URL_PREFIX: &str = "https://www.faceit.com/en/cs2/room/";
/// Discord rejects longer text fields
const MAX_FIELD_CHARS: usize = 128;
const SEPARATOR: &str = " | ";

/// Map name to the art asset key uploaded to the Discord application
const MAP_IMAGES: &[(&str, &str)] = &[
    ("de_mirage", "map_mirage"),
    ("de_inferno", "map_inferno"),
    ("de_dust2", "map_dust2"),
    ("de_nuke", "map_nuke"),
    ("de_overpass", "map_overpass"),
    ("de_ancient", "map_ancient"),
    ("de_anubis", "map_anubis"),
    ("de_vertigo", "map_vertigo"),
    ("de_train", "map_train"),
];

/// Build the payload for `state`, or `None` when presence should be cleared.
///
/// `fallback_start` is used as the elapsed-time origin when the platform has
/// not reported a start time.
pub fn build_payload(
    state: &MatchState,
    settings: &Settings,
    fallback_start: i64,
) -> Option<PresencePayload> {
    let (meta, details, state_line) = match state {
        MatchState::NoMatch => return None,
        MatchState::Lobby { meta, avg_elo } => {
            let details = match shown_map(meta, settings) {
                Some(map) => format!("In Lobby - {}", map),
                None => "In Lobby".to_string(),
            };
            let state_line = match avg_elo.filter(|e| *e > 0 && settings.show_avg_elo) {
                Some(elo) => format!("Avg ELO: {}", format_thousands(u64::from(elo))),
                None => "Waiting for match".to_string(),
            };
            (meta, details, state_line)
        }
        MatchState::Live {
            meta,
            score,
            kda,
            avg_elo,
        } => {
            let mut parts = Vec::new();
            if let Some(map) = shown_map(meta, settings) {
                parts.push(map.to_string());
            }
            if settings.show_score {
                parts.push(format_score(*score));
            }

            let mut state_parts = Vec::new();
            if let Some(kda) = kda.filter(|_| settings.show_kda) {
                state_parts.push(format!("K/D/A: {}", format_kda(kda)));
            }
            if let Some(elo) = avg_elo.filter(|e| *e > 0 && settings.show_avg_elo) {
                state_parts.push(format!("Avg ELO: {}", format_thousands(u64::from(elo))));
            }

            (
                meta,
                join_or(&parts, "In Match"),
                join_or(&state_parts, "Playing"),
            )
        }
        MatchState::Finished {
            meta,
            result,
            score,
            elo_delta,
        } => {
            let mut state_parts = Vec::new();
            if settings.show_score {
                state_parts.push(format_score(*score));
            }
            if let Some(delta) = elo_delta.filter(|_| settings.show_elo) {
                state_parts.push(format!("ELO: {}", format_delta(delta)));
            }

            (
                meta,
                format!("Match Finished - {}", result.label()),
                join_or(&state_parts, "Match Complete"),
            )
        }
    };

    let map = shown_map(meta, settings);

    Some(PresencePayload {
        details: truncate(&details),
        state: truncate(&state_line),
        large_image: LARGE_IMAGE.to_string(),
        large_text: LARGE_TEXT.to_string(),
        small_image: map.and_then(map_image).map(str::to_string),
        small_text: map.map(truncate),
        start_timestamp: meta.started_at.unwrap_or(fallback_start),
        button: PresenceButton {
            label: BUTTON_LABEL.to_string(),
            url: match_url(meta),
        },
    })
}

/// Link to the match room
pub fn match_url(meta: &MatchMeta) -> String {
    meta.room_url
        .clone()
        .unwrap_or_else(|| format!("{}{}", ROOM_URL_PREFIX, meta.match_id))
}

fn shown_map<'a>(meta: &'a MatchMeta, settings: &Settings) -> Option<&'a str> {
    if settings.show_map {
        meta.map.as_deref()
    } else {
        None
    }
}

fn map_image(map: &str) -> Option<&'static str> {
    MAP_IMAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(map))
        .map(|(_, image)| *image)
}

fn join_or(parts: &[String], fallback: &str) -> String {
    if parts.is_empty() {
        fallback.to_string()
    } else {
        parts.join(SEPARATOR)
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_FIELD_CHARS).collect()
}

pub fn format_score(score: Score) -> String {
    format!("{} - {}", score.home, score.away)
}

pub fn format_kda(kda: Kda) -> String {
    format!("{}/{}/{}", kda.kills, kda.deaths, kda.assists)
}

/// `2150` → `2,150`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len().saturating_add(digits.len() / 3));
    let mut remaining = digits.len();
    for ch in digits.chars() {
        if remaining != digits.len() && remaining % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
        remaining = remaining.saturating_sub(1);
    }
    out
}

/// Signed rating change, `+25` or `-18`
pub fn format_delta(delta: i32) -> String {
    let sign = if delta < 0 { "-" } else { "+" };
    format!("{}{}", sign, format_thousands(u64::from(delta.unsigned_abs())))
}
