use async_trait::async_trait;

use crate::{error::CoreError, ids::UserId};

/// Narrow capability the core needs from whatever chat platform client is
/// wired in at the edge. The core never depends on a concrete bot SDK —
/// only this trait — so the pipeline is testable without a live connection.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Resolve a peer entity suitable for sending typing actions, preferring
    /// the platform's lighter "input entity" form.
    async fn resolve_input_entity(&self, user_id: &UserId) -> Result<PeerHandle, CoreError>;

    /// Resolve a full peer entity, used when the input-entity form fails.
    async fn resolve_entity(&self, user_id: &UserId) -> Result<PeerHandle, CoreError>;

    /// Set (or clear) the typing indicator for the given peer.
    async fn set_typing(&self, peer: &PeerHandle, typing: bool) -> Result<(), CoreError>;

    /// Send a single text message, returning the platform's message id.
    async fn send_message(&self, peer: &PeerHandle, text: &str) -> Result<String, CoreError>;
}

/// Opaque, platform-resolved identifier of a peer capable of receiving
/// messages and typing actions. The core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerHandle(pub String);

impl PeerHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
