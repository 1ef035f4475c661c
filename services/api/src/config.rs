use roomagent_core::{
    AgentSettings,
    plugin::{DEFAULT_CHAT_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_SYSTEM_PROMPT},
    token::DEFAULT_TOKEN_TTL_SECS,
};
use secrecy::SecretString;
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection details for the media provider, present only when all three
/// variables are set.
#[derive(Clone, Debug)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub openai_base_url: String,
    pub chat_model: String,
    pub system_prompt: String,
    pub token_ttl_secs: i64,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let livekit_url = non_empty_var("LIVEKIT_URL");
        let livekit_api_key = non_empty_var("LIVEKIT_API_KEY");
        let livekit_api_secret = non_empty_var("LIVEKIT_API_SECRET").map(SecretString::from);
        let openai_api_key = non_empty_var("OPENAI_API_KEY").map(SecretString::from);

        let openai_base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());
        let system_prompt = std::env::var("AGENT_SYSTEM_PROMPT")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        let token_ttl_secs = match std::env::var("TOKEN_TTL_SECS") {
            Ok(value) => value
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "TOKEN_TTL_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", value),
                    )
                })?,
            Err(_) => DEFAULT_TOKEN_TTL_SECS,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            livekit_url,
            livekit_api_key,
            livekit_api_secret,
            openai_api_key,
            openai_base_url,
            chat_model,
            system_prompt,
            token_ttl_secs,
            log_level,
        })
    }

    /// Returns the media provider settings, or the first missing variable.
    pub fn livekit(&self) -> Result<LiveKitConfig, ConfigError> {
        let missing = |name: &str| ConfigError::MissingVar(name.to_string());
        Ok(LiveKitConfig {
            url: self.livekit_url.clone().ok_or_else(|| missing("LIVEKIT_URL"))?,
            api_key: self
                .livekit_api_key
                .clone()
                .ok_or_else(|| missing("LIVEKIT_API_KEY"))?,
            api_secret: self
                .livekit_api_secret
                .clone()
                .ok_or_else(|| missing("LIVEKIT_API_SECRET"))?,
        })
    }

    /// Settings for the language model plugin.
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            provider_credential: self.openai_api_key.clone(),
            model: self.chat_model.clone(),
            system_prompt: self.system_prompt.clone(),
            base_url: self.openai_base_url.clone(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn set_or_not(value: bool) -> &'static str {
    if value { "Set" } else { "Not set" }
}

impl Config {
    /// Logs which settings are present without revealing any secret.
    pub fn log_summary(&self) {
        tracing::info!(
            bind_address = %self.bind_address,
            livekit_url = self.livekit_url.as_deref().unwrap_or("Not set"),
            livekit_api_key = set_or_not(self.livekit_api_key.is_some()),
            livekit_api_secret = set_or_not(self.livekit_api_secret.is_some()),
            openai_api_key = set_or_not(self.openai_api_key.is_some()),
            chat_model = %self.chat_model,
            "Environment configuration"
        );
    }
}
