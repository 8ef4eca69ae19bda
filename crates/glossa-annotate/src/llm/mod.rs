//! Generation gateway: prompt in, description text out.
//!
//! The engine talks to the service through the [`DescriptionSource`]
//! capability trait so the remote call can be swapped for a fixed-file
//! lookup or a constant stub at construction time. The trait is stateless
//! from the engine's point of view; any failure it returns is fatal to the
//! whole run (no retry, no partial-result salvage), because descriptions
//! are cumulative and a half-finished batch is worse than stopping with a
//! resumable cache.

pub mod providers;

use async_trait::async_trait;

pub use providers::{GenerationConfig, LookupSource, OpenAiSource, StaticSource};

/// Token cap passed to the service with every request.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 150;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("generation API error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A source of generated descriptions.
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    /// Produce a description for the prompt, or fail hard.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}
