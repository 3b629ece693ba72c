use async_trait::async_trait;

/// A clickable button shown under the presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceButton {
    pub label: String,
    pub url: String,
}

/// Everything the chat client needs to render one presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    /// First line
    pub details: String,
    /// Second line
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    /// Unix timestamp (seconds) the elapsed timer counts from
    pub start_timestamp: i64,
    pub button: PresenceButton,
}

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("Chat client is not connected")]
    NotConnected,

    #[error("Failed to connect to chat client: {0}")]
    Connect(String),

    #[error("Presence update failed: {0}")]
    Update(String),
}

/// Trait for presence publishers (Discord, or a fake in tests)
#[async_trait]
pub trait PresencePublisher: Send + Sync {
    /// Returns the name of this publisher (for logging)
    fn name(&self) -> &'static str;

    /// Replace the displayed presence
    async fn publish(&self, payload: &PresencePayload) -> Result<(), PresenceError>;

    /// Remove the displayed presence
    async fn clear(&self) -> Result<(), PresenceError>;
}
