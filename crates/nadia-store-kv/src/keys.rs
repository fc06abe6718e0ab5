//! Key naming for every structure the pipeline keeps in the key-value store.

pub const WAL_QUEUE: &str = "nadia_message_queue";
pub const REVIEW_QUEUE: &str = "nadia_review_queue";
pub const OUTBOUND_QUEUE: &str = "nadia_approved_messages";
pub const MESSAGE_BUFFER: &str = "nadia_message_buffer";
pub const TYPING_STATE: &str = "nadia_typing_state";

pub fn history_key(user_id: &str) -> String {
    format!("user:{}:history", user_id)
}
