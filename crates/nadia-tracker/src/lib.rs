pub mod state;
pub mod tracker;

pub use state::{FlushedBatch, PendingMessage};
pub use tracker::ActivityTracker;
