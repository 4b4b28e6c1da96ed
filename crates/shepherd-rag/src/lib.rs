pub mod cache;
pub mod config;
pub mod context;
pub mod corpus;
pub mod engine;
pub mod index;
pub mod intent;
pub mod llm;
pub mod ratelimit;
pub mod router;
pub mod search;
pub mod types;

// Re-export primary types for convenience
pub use config::EngineConfig;
pub use engine::{ChatEngine, FALLBACK_MESSAGE, RATE_LIMIT_MESSAGE};
pub use llm::GenerationBackend;
pub use types::{
    Backend, ChatReply, Citation, EngineStats, Hit, Intent, Passage, ProfileHints, ReloadSummary,
};

// Re-export common types
pub use anyhow::{Error, Result};
pub use uuid::Uuid;
