pub mod error;
pub mod pipeline;
pub mod profile;
pub mod recovery;
pub mod summary;
pub mod supervisor;

pub use error::{OrchestratorError, Result};
pub use pipeline::Pipeline;
pub use profile::UserProfileCache;
pub use recovery::recover_on_startup;
pub use supervisor::Supervisor;
