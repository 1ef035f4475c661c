use anyhow::{Result, anyhow};
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;
use tracing::debug;

/// A language model instantiated for one agent, primed with its system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatModel {
    pub model: String,
    pub system_prompt: String,
}

/// A generic client for bringing up an LLM behind an agent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Instantiates a chat model with `system_prompt`, confirming the provider
    /// accepts the credential and knows the model.
    async fn create_llm(&self, system_prompt: &str) -> Result<ChatModel>;

    /// Releases any provider-side resources held for `model`.
    async fn close_llm(&self, model: &ChatModel) -> Result<()>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn create_llm(&self, system_prompt: &str) -> Result<ChatModel> {
        let model = self.client.models().retrieve(&self.model).await?;
        if model.id.is_empty() {
            return Err(anyhow!("Provider returned a model with no id."));
        }

        Ok(ChatModel {
            model: model.id,
            system_prompt: system_prompt.to_string(),
        })
    }

    async fn close_llm(&self, model: &ChatModel) -> Result<()> {
        // Chat completions are stateless on the provider side.
        debug!(model = %model.model, "Released chat model");
        Ok(())
    }
}
