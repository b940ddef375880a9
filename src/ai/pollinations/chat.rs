use super::client::PollinationsHttpClient;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::ai::ChatService;
use crate::models::ChatMessage;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

const CHAT_PATH: &str = "/openai";

pub struct PollinationsChatClient {
    http: PollinationsHttpClient,
    model: String,
}

impl PollinationsChatClient {
    #[cfg(test)]
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(base_url, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        base_url: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: PollinationsHttpClient::new_with_client(base_url, timeout, client),
            model,
        }
    }
}

#[async_trait]
impl ChatService for PollinationsChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(
            "Sending {} messages to Pollinations chat (model: {})",
            messages.len(),
            self.model
        );

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let response: ChatCompletionResponse = self.http.post(CHAT_PATH, &request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("No choices in chat response".to_string()))?;

        if let Some(reason) = choice.finish_reason.as_deref() {
            if reason != "stop" {
                tracing::warn!("Chat reply finished with reason '{}'", reason);
            }
        }

        choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::AiProvider("Empty reply from chat API".to_string()))
    }
}
