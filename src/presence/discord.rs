//! Discord Rich Presence integration using discord-sdk

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use discord_sdk::{
    activity::{ActivityBuilder, Assets, Button},
    wheel::{UserSpoke, UserState, Wheel},
    Discord, Subscriptions,
};

use super::traits::{PresenceError, PresencePayload, PresencePublisher};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes presence through the local Discord client
pub struct DiscordPublisher {
    discord: Discord,
    user: UserSpoke,
}

impl DiscordPublisher {
    /// Connect to the local Discord client.
    ///
    /// Waits up to [`HANDSHAKE_TIMEOUT`] for the handshake. A missing handshake
    /// is not an error: discord-sdk keeps reconnecting in the background and
    /// publishes fail with [`PresenceError::NotConnected`] until it succeeds.
    pub async fn connect(app_id: i64) -> Result<Self, PresenceError> {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user = wheel.user();

        let discord = Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler))
            .map_err(|e| PresenceError::Connect(format!("{:?}", e)))?;

        tracing::info!("Discord connecting...");

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, user.0.changed()).await {
            Ok(Ok(())) => match &*user.0.borrow() {
                UserState::Connected(u) => {
                    tracing::info!("Discord Rich Presence connected as {}", u.username);
                }
                UserState::Disconnected(err) => {
                    tracing::warn!("Discord disconnected: {:?}", err);
                }
            },
            Ok(Err(_)) => tracing::warn!("Discord connection closed"),
            Err(_) => tracing::warn!("Discord handshake timed out, will keep retrying"),
        }

        Ok(Self { discord, user })
    }

    pub fn is_connected(&self) -> bool {
        matches!(&*self.user.0.borrow(), UserState::Connected(_))
    }

    pub async fn disconnect(self) {
        self.discord.disconnect().await;
        tracing::info!("Discord Rich Presence disconnected");
    }
}

fn build_activity(payload: &PresencePayload) -> ActivityBuilder {
    let assets = match &payload.small_image {
        Some(small) => Assets::default()
            .large(payload.large_image.clone(), Some(payload.large_text.clone()))
            .small(small.clone(), payload.small_text.clone()),
        None => Assets::default().large(payload.large_image.clone(), Some(payload.large_text.clone())),
    };

    let start = u64::try_from(payload.start_timestamp)
        .map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap_or_else(|_| SystemTime::now());

    ActivityBuilder::new()
        .details(payload.details.clone())
        .state(payload.state.clone())
        .assets(assets)
        .start_timestamp(start)
        .button(Button {
            label: payload.button.label.clone(),
            url: payload.button.url.clone(),
        })
}

#[async_trait]
impl PresencePublisher for DiscordPublisher {
    fn name(&self) -> &'static str {
        "Discord"
    }

    async fn publish(&self, payload: &PresencePayload) -> Result<(), PresenceError> {
        if !self.is_connected() {
            return Err(PresenceError::NotConnected);
        }

        self.discord
            .update_activity(build_activity(payload))
            .await
            .map(|_| ())
            .map_err(|e| PresenceError::Update(format!("{:?}", e)))
    }

    async fn clear(&self) -> Result<(), PresenceError> {
        if !self.is_connected() {
            return Err(PresenceError::NotConnected);
        }

        self.discord
            .clear_activity()
            .await
            .map(|_| ())
            .map_err(|e| PresenceError::Update(format!("{:?}", e)))
    }
}
