use std::sync::Arc;
use std::time::Duration;

use nadia_core::{ChatTransport, PeerHandle};

/// Refresh interval for the typing indicator. Most chat platforms expire a
/// typing status after a few seconds of silence, so this must stay well
/// under that — mirrors the reference Telegram adapter's refresh cadence.
const REFRESH_INTERVAL: Duration = Duration::from_secs(4);

/// Handle to a background typing-indicator loop. Drop or call `stop()` once
/// the bubble is ready to send so the indicator doesn't linger.
pub struct TypingHandle(tokio::task::JoinHandle<()>);

impl TypingHandle {
    /// Start signalling "typing" to `peer` immediately, repeating every
    /// [`REFRESH_INTERVAL`] until stopped.
    pub fn start<T: ChatTransport + 'static>(transport: Arc<T>, peer: PeerHandle) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let _ = transport.set_typing(&peer, true).await;
                tokio::time::sleep(REFRESH_INTERVAL).await;
            }
        });
        TypingHandle(handle)
    }

    /// Abort the loop. Does not explicitly clear the typing flag — it will
    /// simply expire on the platform side.
    pub fn stop(self) {
        self.0.abort();
    }
}
