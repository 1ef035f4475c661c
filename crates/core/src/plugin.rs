//! Language Model Plugin Initialization
//!
//! Brings up the optional LLM integration for an agent session. A missing
//! credential or a provider failure never fails the session: the initializer
//! logs the problem and returns `None`, and the session runs without an agent.

use crate::{
    error::SessionError,
    llm_client::{ChatModel, LLMClient, OpenAICompatibleClient},
};
use async_openai::config::OpenAIConfig;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The system prompt every agent starts with.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that speaks in a friendly tone. Your job is to assist users with their questions and provide informative responses.";

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Builds an `LLMClient` from a provider credential and model name.
pub type ClientBuilder = Arc<dyn Fn(&SecretString, &str) -> Arc<dyn LLMClient> + Send + Sync>;

/// Wraps a closure as a [`ClientBuilder`].
pub fn client_builder<F>(build: F) -> ClientBuilder
where
    F: Fn(&SecretString, &str) -> Arc<dyn LLMClient> + Send + Sync + 'static,
{
    Arc::new(build)
}

/// Settings for agent plugins, built once from process configuration.
#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub provider_credential: Option<SecretString>,
    pub model: String,
    pub system_prompt: String,
    pub base_url: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            provider_credential: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

/// An opaque handle to the language model attached to one session.
///
/// The handle must be released with [`AgentHandle::close`]; closing consumes
/// it, so release happens at most once.
pub struct AgentHandle {
    id: Uuid,
    model: ChatModel,
    client: Arc<dyn LLMClient>,
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.id)
            .field("model", &self.model.model)
            .finish()
    }
}

impl AgentHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &ChatModel {
        &self.model
    }

    /// Releases the model. Failures are logged; there is nothing left to retry.
    pub async fn close(self) {
        match self.client.close_llm(&self.model).await {
            Ok(()) => info!(agent_id = %self.id, "Agent released"),
            Err(e) => warn!(agent_id = %self.id, error = ?e, "Agent release reported an error"),
        }
    }
}

/// Creates agent handles for sessions.
pub struct PluginInitializer {
    settings: AgentSettings,
    builder: ClientBuilder,
}

impl PluginInitializer {
    /// An initializer backed by an OpenAI-compatible provider.
    pub fn new(settings: AgentSettings) -> Self {
        let base_url = settings.base_url.clone();
        let builder = client_builder(move |credential, model| {
            let config = OpenAIConfig::new()
                .with_api_key(credential.expose_secret())
                .with_api_base(&base_url);
            Arc::new(OpenAICompatibleClient::new(config, model.to_string()))
        });
        Self::with_builder(settings, builder)
    }

    /// An initializer that builds its provider client with `builder`.
    pub fn with_builder(settings: AgentSettings, builder: ClientBuilder) -> Self {
        Self { settings, builder }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Initializes an agent with the configured credential.
    pub async fn initialize_configured(&self) -> Option<AgentHandle> {
        self.initialize(self.settings.provider_credential.as_ref())
            .await
    }

    /// Initializes an agent, or returns `None` when no agent is available.
    ///
    /// Each call produces an independent handle.
    pub async fn initialize(&self, credential: Option<&SecretString>) -> Option<AgentHandle> {
        let Some(credential) = credential else {
            warn!("No language model credential configured. Agent will run without AI capabilities.");
            return None;
        };

        info!(model = %self.settings.model, "Initializing language model plugin");
        let client = (self.builder)(credential, &self.settings.model);

        match client.create_llm(&self.settings.system_prompt).await {
            Ok(model) => {
                let handle = AgentHandle {
                    id: Uuid::new_v4(),
                    model,
                    client,
                };
                info!(agent_id = %handle.id, model = %handle.model.model, "Language model initialized successfully");
                Some(handle)
            }
            Err(e) => {
                let failure = SessionError::PluginInitFailure(e.to_string());
                error!(error = %failure, "Continuing without an agent");
                None
            }
        }
    }
}
