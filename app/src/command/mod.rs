//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, enabling
//! static dispatch with no runtime overhead. Shared wiring between the
//! config schema and the runtime pieces lives here so `run` and `chat`
//! build the exact same assistant.

use std::sync::Arc;
use std::time::Duration;

use warelay_config::Config;
use warelay_conversation::{CompletionClient, Preamble, SessionStore};
use warelay_core::CompletionProvider;
use warelay_providers::{GeminiProvider, GenerationConfig, KeyPool, RetryPolicy};

mod chat;
mod init;
mod run;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use init::InitStrategy;
pub use run::RunStrategy;
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// One provider per configured credential, sharing the model settings.
fn build_providers(config: &Config) -> Vec<Arc<dyn CompletionProvider>> {
    let generation = GenerationConfig {
        temperature: config.assistant.temperature,
        top_k: config.assistant.top_k,
        top_p: config.assistant.top_p,
        max_output_tokens: config.assistant.max_output_tokens,
    };

    config
        .gateway
        .api_keys
        .iter()
        .map(|key| {
            Arc::new(GeminiProvider::new(
                key.clone(),
                config.assistant.model.clone(),
                generation.clone(),
            )) as Arc<dyn CompletionProvider>
        })
        .collect()
}

fn build_key_pool(config: &Config) -> anyhow::Result<KeyPool> {
    KeyPool::new(build_providers(config))
}

fn build_session_store(config: &Config) -> SessionStore {
    SessionStore::new(
        Preamble::new(
            config.assistant.system_prompt.clone(),
            config.assistant.acknowledgment.clone(),
        ),
        config.session.max_context_messages,
        config.session.timeout_minutes,
    )
}

fn build_completion_client(config: &Config) -> CompletionClient {
    CompletionClient::new(
        RetryPolicy::new(
            config.completion.max_attempts,
            Duration::from_secs(config.completion.base_delay_secs),
        ),
        config.texts.apology.clone(),
    )
}
