use async_trait::async_trait;
use thiserror::Error;

/// Errors from the chat platform. The store is the source of truth, so these
/// are usually logged and swallowed rather than unwinding a command.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("discord api error: {0}")]
    Api(String),

    #[error("invalid discord id: {0}")]
    InvalidId(String),

    #[error("discord client not connected")]
    NotConnected,
}

#[derive(Debug, Clone)]
pub struct CreatedChannel {
    pub id: String,
    pub name: String,
}

/// The narrow contract this bot needs from the chat platform: create one
/// channel, post one message, keep editing it. Everything is best-effort
/// mirroring of durable store state; protocol concerns stay behind the
/// implementation.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Creates a private planning channel for an event, visible to the
    /// creator, parented under the "Active Plans" category when one exists.
    async fn create_event_channel(
        &self,
        guild_id: &str,
        name: &str,
        topic: &str,
        creator_id: &str,
    ) -> Result<CreatedChannel, SurfaceError>;

    /// Sends a message and returns its id.
    async fn send_message(&self, channel_id: &str, content: &str)
    -> Result<String, SurfaceError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), SurfaceError>;

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<(), SurfaceError>;

    /// The bot's own id and username, once logged in. Used to attribute the
    /// announcement message in the audit log.
    async fn bot_identity(&self) -> Option<(String, String)>;
}
