pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod router;
pub mod transport;

pub use config::NadiaConfig;
pub use error::{CoreError, Result};
pub use ids::{ConversationId, InteractionId, UserId};
pub use model::{HistoryTurn, Interaction, Recommendation, ReviewStatus, Role, SafetyVerdict};
pub use router::{CognitiveRouter, Route};
pub use transport::{ChatTransport, PeerHandle};
