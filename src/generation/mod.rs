//! Text generation clients.
//!
//! The advisory pipeline treats generation as an opaque call: it hands over
//! the assembled prompt and a token budget and receives free text. Errors are
//! returned to the caller exactly as the client produced them.
//!
//! # Clients
//!
//! | Client | Notes |
//! |--------|-------|
//! | [`OpenAICompatibleClient`] | Any `/chat/completions` endpoint (vLLM, Ollama, hosted APIs) |
//! | [`MockGenerationClient`] | Queue-based, no network; for tests |

mod mock;
mod openai_compatible;

pub use mock::MockGenerationClient;
pub use openai_compatible::OpenAICompatibleClient;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{GenerationConfig, GenerationProvider};
use crate::error::Result;

/// A model that turns a prompt into free text.
///
/// Implementations must be safe to share across concurrent queries.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Client identifier, e.g. "openai_compatible".
    fn name(&self) -> &str;

    /// Model being called.
    fn model(&self) -> &str;

    /// Generate at most `max_tokens` tokens of text for `prompt`.
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String>;
}

/// Build the generation client described by a configuration section.
pub fn build_generation_client(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = match config.provider {
        GenerationProvider::Mock => Arc::new(MockGenerationClient::new()),
        GenerationProvider::OpenAICompatible => {
            Arc::new(OpenAICompatibleClient::from_config(config)?)
        }
    };
    info!(
        "Generation client ready: {} (model {})",
        client.name(),
        client.model()
    );
    Ok(client)
}
