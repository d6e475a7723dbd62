pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use controller::{PendingTurn, TurnController, TurnOutcome, APOLOGY_MESSAGE, WELCOME_MESSAGE};
pub use error::FetchError;
pub use fetcher::{ChatReply, HealthStatus, HttpReplyFetcher, ReplyFetcher, FALLBACK_REPLY};
pub use state::{ChatMessage, ChatRole, Transcript};
