use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use namegov_core::AiSettings;

use crate::{prompt, Result, SuggestError};

/// The one boundary to a text-generation service: prompt in, raw text out.
///
/// JSON extraction and repair happen on the returned text in [`crate::parse`],
/// never inside implementations.
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

fn map_backend(provider: &str) -> Result<LLMBackend> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(SuggestError::UnknownProvider(other.to_string())),
    }
}

/// [`TextGenerationClient`] backed by the provider named in [`AiSettings`].
#[derive(Clone)]
pub struct LlmClient {
    settings: AiSettings,
    system: String,
}

impl LlmClient {
    pub fn new(settings: AiSettings) -> Result<Self> {
        if !namegov_core::ai_configured(&settings) {
            return Err(SuggestError::NotConfigured);
        }
        map_backend(&settings.provider)?;
        Ok(Self {
            settings,
            system: prompt::system_prompt(),
        })
    }
}

#[async_trait]
impl TextGenerationClient for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let backend = map_backend(&self.settings.provider)?;

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&self.settings.model)
            .system(&self.system);

        if !self.settings.api_key.is_empty() {
            builder = builder.api_key(&self.settings.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| SuggestError::Build(e.to_string()))?;

        let messages = vec![ChatMessage::user().content(prompt).build()];

        tracing::debug!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            "sending prompt"
        );
        let response = llm
            .chat(&messages)
            .await
            .map_err(|e| SuggestError::Chat(e.to_string()))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(SuggestError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(matches!(
            map_backend("watson"),
            Err(SuggestError::UnknownProvider(ref p)) if p == "watson"
        ));
        assert!(map_backend("ollama").is_ok());
    }

    #[test]
    fn unconfigured_settings_are_rejected() {
        assert!(matches!(
            LlmClient::new(AiSettings::default()),
            Err(SuggestError::NotConfigured)
        ));
        let settings = AiSettings {
            provider: "watson".into(),
            api_key: "key".into(),
            model: "m".into(),
        };
        assert!(matches!(
            LlmClient::new(settings),
            Err(SuggestError::UnknownProvider(_))
        ));
    }
}
