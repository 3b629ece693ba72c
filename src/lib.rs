pub mod config;
pub mod faceit;
pub mod logging;
pub mod monitor;
pub mod presence;
pub mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use config::Credentials;
use faceit::{FaceitClient, FaceitError, MatchSource, Player};
use monitor::{spawn_monitor, Monitor, MonitorHandle};
use presence::{DiscordPublisher, PresencePublisher};
use settings::{FileSettings, MemorySettings, SettingsProvider};

/// Directory name used under the platform config and data directories
pub const APP_DIR_NAME: &str = "faceit-presence";

/// Run the monitor until Ctrl+C
pub async fn run() -> ExitCode {
    let debug = std::env::args().skip(1).any(|arg| arg == "--debug");
    let _log_guard = logging::init_logging(debug);

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(errors) => {
            for error in &errors {
                tracing::error!("Configuration error: {}", error);
            }
            tracing::error!("Set the variables in the environment or a .env file and restart");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("Loaded configuration: {:?}", credentials);

    let settings: Arc<dyn SettingsProvider> = match FileSettings::open_default() {
        Ok(settings) => {
            tracing::info!("Using settings from {}", settings.path().display());
            Arc::new(settings)
        }
        Err(e) => {
            tracing::warn!("Settings file unavailable ({}), using defaults", e);
            Arc::new(MemorySettings::default())
        }
    };

    let client = match FaceitClient::new(&credentials.api_key) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to create FACEIT client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let player = match resolve_player(client.as_ref(), &credentials.nickname).await {
        Ok(player) => player,
        Err(code) => return code,
    };

    let discord = match DiscordPublisher::connect(credentials.discord_app_id).await {
        Ok(discord) => Arc::new(discord),
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut monitor = Monitor::new(
        credentials.nickname.clone(),
        client as Arc<dyn MatchSource>,
        Arc::clone(&discord) as Arc<dyn PresencePublisher>,
        settings,
    );
    if let Some(player) = player {
        monitor = monitor.with_player(player);
    }

    let handle = spawn_monitor(monitor);
    let status_task = tokio::spawn(log_status_changes(&handle));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
    tracing::info!("Shutting down...");

    status_task.abort();
    if let Some(mut monitor) = handle.stop().await {
        if let Err(e) = monitor.clear_presence().await {
            tracing::warn!("Failed to clear presence on shutdown: {}", e);
        }
    }

    match Arc::try_unwrap(discord) {
        Ok(discord) => discord.disconnect().await,
        Err(_) => tracing::debug!("Discord connection still shared, not disconnecting"),
    }

    ExitCode::SUCCESS
}

/// Look the player up once before polling starts.
///
/// A bad key or an unknown nickname stops the program. Passing failures do not:
/// the monitor retries the lookup on its own schedule.
async fn resolve_player(client: &FaceitClient, nickname: &str) -> Result<Option<Player>, ExitCode> {
    match client.player_by_nickname(nickname).await {
        Ok(Some(player)) => {
            tracing::info!(
                "Tracking {} (level {}, ELO {})",
                player.nickname,
                player.skill_level.map_or_else(|| "?".to_string(), |l| l.to_string()),
                player.elo.map_or_else(|| "?".to_string(), |e| e.to_string())
            );
            Ok(Some(player))
        }
        Ok(None) => {
            tracing::error!("Player '{}' not found on FACEIT", nickname);
            Err(ExitCode::FAILURE)
        }
        Err(e) if e.is_fatal() => {
            tracing::error!("FACEIT rejected the API key: {}", e);
            Err(ExitCode::FAILURE)
        }
        Err(FaceitError::RateLimited(retry_after)) => {
            tracing::warn!(
                "Rate limited during startup, lookup retried in {}s",
                retry_after.as_secs()
            );
            Ok(None)
        }
        Err(e) => {
            tracing::warn!("Player lookup failed, will retry: {}", e);
            Ok(None)
        }
    }
}

fn log_status_changes(handle: &MonitorHandle) -> impl std::future::Future<Output = ()> {
    let mut status = handle.subscribe();
    async move {
        let mut last = status.borrow_and_update().to_string();
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().to_string();
            if current != last {
                tracing::info!("Status: {}", current);
                last = current;
            }
        }
    }
}
