pub mod pacing;
pub mod sender;
pub mod typing;

pub use sender::PacedSender;
pub use typing::TypingHandle;
