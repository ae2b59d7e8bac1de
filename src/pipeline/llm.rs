//! Remote text service: one prompt in, one completion out.
//!
//! [`TextService`] is the only seam the dispatcher sees. The production
//! implementation, [`LlmTextService`], forwards to an `edgequake_llm`
//! provider; tests substitute in-memory services.
//!
//! A call either fails outright ([`ServiceError`]) or returns a
//! [`Completion`]. A completion whose text is missing or empty is not an
//! error at this level; the dispatcher turns it into an "invalid response"
//! outcome carrying whatever detail the service exposed.

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::settings::Settings;
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider, OpenAIProvider,
    ProviderFactory,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Model used when neither the config nor the settings name one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Models offered by `pdfview settings models` and accepted from settings.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-pro-exp-03-25",
    "gemini-2.0-flash",
    "gemini-1.5-pro-latest",
    "gemini-1.5-flash-latest",
    "gemini-pro",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash-8b",
];

/// What the service returned for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Generated text (possibly empty).
    Text(String),
    /// The service answered without text; carries its diagnostic if any.
    Rejected(Option<String>),
}

/// The remote call itself failed.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

#[async_trait]
pub trait TextService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, ServiceError>;
}

/// [`TextService`] backed by an `edgequake_llm` provider.
pub struct LlmTextService {
    provider: Arc<dyn LLMProvider>,
    model: String,
    options: CompletionOptions,
}

impl LlmTextService {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, config: &ViewerConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            options: build_options(config),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextService for LlmTextService {
    async fn complete(&self, prompt: &str) -> Result<Completion, ServiceError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ServiceError(format!("{}", e)))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.is_empty() {
            return Ok(Completion::Rejected(Some(format!(
                "empty completion ({} output tokens)",
                response.completion_tokens
            ))));
        }
        Ok(Completion::Text(response.content))
    }
}

fn build_options(config: &ViewerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Environment variable the named provider reads its API key from.
pub fn api_key_env_var(provider_name: &str) -> Option<&'static str> {
    match provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        _ => None,
    }
}

/// Build the text service from config and saved settings.
///
/// The model is the config override, else the saved model, else
/// [`DEFAULT_MODEL`]. A key in the provider's environment variable wins;
/// otherwise a saved key is handed straight to the provider. The process
/// environment is never modified.
///
/// # Errors
/// [`ViewerError::ServiceNotConfigured`] when no key is available for a
/// provider that needs one, or the provider cannot be created.
pub fn resolve_service(
    config: &ViewerConfig,
    settings: &Settings,
) -> Result<Arc<dyn TextService>, ViewerError> {
    let provider_name = config.provider_name.as_str();
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| settings.effective_model().to_string());

    if let Some(var) = api_key_env_var(provider_name) {
        let from_env = std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false);
        let saved = settings.api_key.as_deref().filter(|k| !k.is_empty());
        match (from_env, saved) {
            (true, Some(_)) => debug!("{} already set; ignoring saved API key", var),
            (true, None) => {}
            (false, Some(key)) => {
                let provider = provider_with_key(provider_name, key, &model).ok_or_else(|| {
                    ViewerError::ServiceNotConfigured {
                        provider: provider_name.to_string(),
                        hint: format!("A saved key cannot be used with {provider_name}; set {var}."),
                    }
                })?;
                info!("Text service ready: {} / {} (saved key)", provider_name, model);
                return Ok(Arc::new(LlmTextService::new(provider, model, config)));
            }
            (false, None) => {
                return Err(ViewerError::ServiceNotConfigured {
                    provider: provider_name.to_string(),
                    hint: format!(
                        "Set {var} or save a key with `pdfview settings set-key <KEY>`."
                    ),
                });
            }
        }
    }

    let provider = ProviderFactory::create_llm_provider(provider_name, &model).map_err(|e| {
        warn!("Could not create provider '{}': {}", provider_name, e);
        ViewerError::ServiceNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;

    info!("Text service ready: {} / {}", provider_name, model);
    Ok(Arc::new(LlmTextService::new(provider, model, config)))
}

/// Build a provider around an explicit key. `None` for providers that
/// only read their key from the environment.
fn provider_with_key(provider_name: &str, api_key: &str, model: &str) -> Option<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Arc::new(GeminiProvider::new(api_key).with_model(model)),
        "openai" => Arc::new(OpenAIProvider::new(api_key).with_model(model)),
        "anthropic" => Arc::new(AnthropicProvider::new(api_key).with_model(model)),
        _ => return None,
    };
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = ViewerConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[test]
    fn default_model_is_offered() {
        assert!(AVAILABLE_MODELS.contains(&DEFAULT_MODEL));
    }

    #[test]
    fn key_variables_per_provider() {
        assert_eq!(api_key_env_var("gemini"), Some("GEMINI_API_KEY"));
        assert_eq!(api_key_env_var("OpenAI"), Some("OPENAI_API_KEY"));
        assert_eq!(api_key_env_var("ollama"), None);
    }

    #[test]
    fn saved_key_builds_provider_without_touching_env() {
        let before = std::env::var("GEMINI_API_KEY").ok();
        let provider = provider_with_key("Gemini", "saved-key", "gemini-2.0-flash").unwrap();
        assert_eq!(provider.model(), "gemini-2.0-flash");
        assert_eq!(std::env::var("GEMINI_API_KEY").ok(), before);

        assert!(provider_with_key("openai", "k", "gpt-4o-mini").is_some());
        assert!(provider_with_key("mistral", "k", "mistral-small-latest").is_none());
    }
}
