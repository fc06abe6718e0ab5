use async_trait::async_trait;
use nadia_core::{ChatTransport, CoreError, PeerHandle, UserId};
use tracing::info;

/// Default transport wired up when no platform-specific adapter is
/// configured. Logs every action instead of calling out to a real chat
/// platform — enough to exercise the pipeline end to end in development.
/// A production deployment supplies its own [`ChatTransport`] implementation
/// (Telegram, Discord, ...) and wires it in here instead; the trait boundary
/// is the whole point — nothing upstream of it cares which one is active.
pub struct LoggingTransport;

#[async_trait]
impl ChatTransport for LoggingTransport {
    async fn resolve_input_entity(&self, user_id: &UserId) -> Result<PeerHandle, CoreError> {
        Ok(PeerHandle(user_id.as_str().to_string()))
    }

    async fn resolve_entity(&self, user_id: &UserId) -> Result<PeerHandle, CoreError> {
        Ok(PeerHandle(user_id.as_str().to_string()))
    }

    async fn set_typing(&self, peer: &PeerHandle, typing: bool) -> Result<(), CoreError> {
        info!(peer = peer.as_str(), typing, "set_typing");
        Ok(())
    }

    async fn send_message(&self, peer: &PeerHandle, text: &str) -> Result<String, CoreError> {
        info!(peer = peer.as_str(), text, "send_message");
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
