pub mod buffer;
pub mod client;
pub mod error;
pub mod history;
pub mod keys;
pub mod typing;
pub mod wal;

pub use buffer::{BufferStore, BufferedMessage};
pub use client::KvStore;
pub use error::{KvError, Result};
pub use history::HistoryStore;
pub use typing::TypingStateStore;
pub use wal::{OutboundQueue, WalEntry, WalQueue};
