mod discord;
mod traits;

pub use discord::DiscordPublisher;
pub use traits::{PresenceButton, PresenceError, PresencePayload, PresencePublisher};
