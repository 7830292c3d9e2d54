use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::error::AppError;

/// A chat model that answers a single prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user message pair and return the reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AppError>;
}

/// [`LlmClient`] backed by an OpenAI-compatible chat completions API.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, api_base: Option<&str>, model: impl Into<String>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }

        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    fn messages(system: &str, prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>, AppError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build system message: {e}")))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build user message: {e}")))?;

        Ok(vec![system.into(), user.into()])
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(Self::messages(system, prompt)?)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build completion request: {e}")))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::warn!(model = %self.model, "Chat completion failed: {e}");
            AppError::Upstream(format!("AI provider request failed: {e}"))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Upstream("AI provider returned an empty reply".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_roles_in_order() {
        let messages = OpenAiClient::messages("be brief", "summarize this").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_mock_client() {
        let mut mock = MockLlmClient::new();
        mock.expect_complete()
            .returning(|_, prompt| Ok(format!("echo: {prompt}")));

        let reply = mock.complete("sys", "hello").await.unwrap();
        assert_eq!(reply, "echo: hello");
    }
}
