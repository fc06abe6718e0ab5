pub mod error;
pub mod http;
pub mod queue;

pub use error::{Result, ReviewError};
pub use http::{build_router, DashboardState};
pub use queue::ReviewQueue;
