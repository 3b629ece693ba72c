use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use super::error::FaceitError;
use super::models::{HistoryResponse, MatchResponse, PlayerResponse, StatsResponse, GAME_ID};
use super::types::{Kda, MatchFacts, MatchPhase, MatchQuery, Player, PollResult};
use super::MatchSource;

const BASE_URL: &str = "https://open.faceit.com/data/v4/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default minimum spacing between two requests from this client
const MIN_REQUEST_SPACING: Duration = Duration::from_secs(1);
/// Used when a 429 comes without a usable Retry-After header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
const ONGOING_HISTORY_LIMIT: &str = "5";
const ELO_HISTORY_LIMIT: &str = "10";

/// Client for the FACEIT Data API
pub struct FaceitClient {
    http: reqwest::Client,
    base_url: Url,
    request_spacing: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl FaceitClient {
    pub fn new(api_key: &str) -> Result<Self, FaceitError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| FaceitError::Unauthorized)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("faceit-presence/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: Url::parse(BASE_URL)?,
            request_spacing: MIN_REQUEST_SPACING,
            last_request: Mutex::new(None),
        })
    }

    /// Point the client at another API root (a proxy or a local mock)
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, FaceitError> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        self.base_url = url;
        Ok(self)
    }

    /// Change the minimum gap between two requests
    pub fn with_request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.request_spacing;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FaceitError> {
        self.throttle().await;

        let url = self.base_url.join(path)?;
        tracing::debug!("GET {}", url.path());

        let response = self.http.get(url).query(query).send().await?;
        check_status(response.status(), response.headers())?;

        Ok(response.json().await?)
    }

    pub async fn player_by_nickname(&self, nickname: &str) -> Result<Option<Player>, FaceitError> {
        let result = self
            .get_json::<PlayerResponse>("players", &[("nickname", nickname), ("game", GAME_ID)])
            .await;

        match result {
            Ok(response) => Ok(Some(response.into())),
            Err(FaceitError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn ongoing_match_id(&self, player_id: &str) -> Result<Option<String>, FaceitError> {
        let history: HistoryResponse = self
            .get_json(
                &format!("players/{}/history", player_id),
                &[("game", GAME_ID), ("limit", ONGOING_HISTORY_LIMIT)],
            )
            .await?;

        Ok(history.ongoing_match_id().map(str::to_string))
    }

    pub async fn match_facts(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<Option<MatchFacts>, FaceitError> {
        match self
            .get_json::<MatchResponse>(&format!("matches/{}", match_id), &[])
            .await
        {
            Ok(response) => Ok(response.into_facts(player_id)),
            Err(FaceitError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn player_kda(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> Result<Option<Kda>, FaceitError> {
        match self
            .get_json::<StatsResponse>(&format!("matches/{}/stats", match_id), &[])
            .await
        {
            Ok(stats) => Ok(stats.kda_for(player_id)),
            Err(FaceitError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn elo_delta(
        &self,
        player_id: &str,
        match_id: &str,
    ) -> Result<Option<i32>, FaceitError> {
        let history: HistoryResponse = self
            .get_json(
                &format!("players/{}/history", player_id),
                &[("game", GAME_ID), ("limit", ELO_HISTORY_LIMIT)],
            )
            .await?;

        Ok(history.elo_delta(match_id))
    }

    async fn poll(
        &self,
        player: &Player,
        query: &MatchQuery,
    ) -> Result<Option<MatchFacts>, FaceitError> {
        let match_id = match self.ongoing_match_id(&player.id).await? {
            Some(id) => id,
            None => match &query.follow {
                Some(id) => id.clone(),
                None => return Ok(None),
            },
        };

        let Some(mut facts) = self.match_facts(&match_id, &player.id).await? else {
            return Ok(None);
        };

        match facts.phase {
            MatchPhase::Live if query.with_kda => {
                facts.kda = optional(self.player_kda(&match_id, &player.id).await, "KDA")?;
            }
            MatchPhase::Finished if query.with_elo_delta => {
                facts.elo_delta =
                    optional(self.elo_delta(&player.id, &match_id).await, "ELO change")?;
            }
            _ => {}
        }

        Ok(Some(facts))
    }
}

#[async_trait]
impl MatchSource for FaceitClient {
    async fn lookup_player(&self, nickname: &str) -> Result<Option<Player>, FaceitError> {
        self.player_by_nickname(nickname).await
    }

    async fn current_match(&self, player: &Player, query: &MatchQuery) -> PollResult {
        match self.poll(player, query).await {
            Ok(Some(facts)) => PollResult::Success(facts),
            Ok(None) => PollResult::NotFound,
            Err(e) => e.into(),
        }
    }
}

/// Secondary lookups only fail the poll when the server asked us to back off
fn optional<T>(
    result: Result<Option<T>, FaceitError>,
    what: &str,
) -> Result<Option<T>, FaceitError> {
    match result {
        Ok(value) => Ok(value),
        Err(FaceitError::RateLimited(retry_after)) => Err(FaceitError::RateLimited(retry_after)),
        Err(e) => {
            tracing::debug!("Could not fetch {}: {}", what, e);
            Ok(None)
        }
    }
}

fn check_status(status: StatusCode, headers: &HeaderMap) -> Result<(), FaceitError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FaceitError::Unauthorized),
        StatusCode::NOT_FOUND => Err(FaceitError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(FaceitError::RateLimited(retry_after(headers))),
        s => Err(FaceitError::Status(s.as_u16())),
    }
}

/// Parse Retry-After as either delay-seconds or an HTTP date
fn retry_after(headers: &HeaderMap) -> Duration {
    let Some(value) = headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
    else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .and_then(|at| (at.with_timezone(&chrono::Utc) - chrono::Utc::now()).to_std().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
