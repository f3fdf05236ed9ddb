//! Language model abstraction used by the synthesis and document stages.

pub mod error;
mod openrouter;

pub use error::{LlmError, LlmErrorKind, RetryConfig};
pub use openrouter::OpenRouterModel;

use async_trait::async_trait;

/// Text-in, text-out model interface.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Whether a real model backs this instance.
    fn is_available(&self) -> bool;

    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableModel;

#[async_trait]
impl LanguageModel for UnavailableModel {
    fn is_available(&self) -> bool {
        false
    }

    async fn invoke(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::unavailable())
    }
}
