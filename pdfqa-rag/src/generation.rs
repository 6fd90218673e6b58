//! Generation provider traits.
//!
//! Two kinds of generation back the answerer:
//!
//! - [`ChatModel`]: a remote chat-completion API taking a system and a user
//!   message. Calls may fail for network, auth, or quota reasons.
//! - [`TextGenerator`]: a local model taking a single prompt. It is created
//!   through a [`GeneratorLoader`] the first time it is needed, because
//!   loading can be slow.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// A remote chat-completion provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a reply to `user_prompt` under the `system_prompt` instruction.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Provider identity used in logs.
    fn name(&self) -> &str;

    /// Provider name shown to users in answer text. Defaults to [`name`](ChatModel::name).
    fn display_name(&self) -> &str {
        self.name()
    }
}

/// A loaded local text-generation model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Creates a [`TextGenerator`] bound to a named model.
#[async_trait]
pub trait GeneratorLoader: Send + Sync {
    /// Load `model` and return a handle that can be reused for every request.
    async fn load(&self, model: &str) -> Result<Arc<dyn TextGenerator>>;
}
