use super::{ChatService, ImageGenerationService};
use crate::models::{ChatMessage, Illustration, ImageRequest, Role};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Scripted chat client that records every history it receives.
#[derive(Clone)]
pub struct MockChatClient {
    responses: Arc<Mutex<Vec<std::result::Result<String, String>>>>,
    histories: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            histories: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(Ok(response));
        self
    }

    pub fn with_error(self, message: String) -> Self {
        self.responses.lock().unwrap().push(Err(message));
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn recorded_histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        self.histories.lock().unwrap().push(messages.to_vec());

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock story built around the latest user prompt
            let prompt = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.trim().to_string())
                .unwrap_or_else(|| "a quiet village".to_string());
            Ok(format!(
                "Once there was {}.\nThe day began with a surprise.\nBy nightfall everyone was friends.",
                prompt
            ))
        } else {
            let index = (*count - 1) % responses.len();
            responses[index].clone().map_err(Error::AiProvider)
        }
    }
}

/// Image client that returns a tiny PNG and records the requests it saw.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    base_url: String,
    failing_prompts: Arc<Mutex<HashSet<String>>>,
    requests: Arc<Mutex<Vec<ImageRequest>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            base_url: "https://mock-images.example.com".to_string(),
            failing_prompts: Arc::new(Mutex::new(HashSet::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure_for(self, prompt: String) -> Self {
        self.failing_prompts.lock().unwrap().insert(prompt);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn recorded_requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    fn image_url(&self, request: &ImageRequest) -> Result<String> {
        Ok(format!(
            "{}/prompt/{}?seed={}&height={}",
            self.base_url,
            request.prompt.replace(' ', "%20"),
            request.seed,
            request.height
        ))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Illustration> {
        self.requests.lock().unwrap().push(request.clone());

        if self.failing_prompts.lock().unwrap().contains(&request.prompt) {
            return Err(Error::AiProvider(format!(
                "Mock failure for prompt '{}'",
                request.prompt
            )));
        }

        Ok(Illustration {
            url: self.image_url(request)?,
            mime: "image/png".to_string(),
            bytes: vec![
                0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
                0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chat_default_reply_mentions_prompt() {
        let client = MockChatClient::new();
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("a cat named Whiskers"),
        ];

        let reply = client.complete(&messages).await.unwrap();
        assert!(reply.contains("a cat named Whiskers"));
        assert_eq!(client.recorded_histories(), vec![messages]);
    }

    #[tokio::test]
    async fn test_mock_chat_custom_responses_cycle() {
        let client = MockChatClient::new()
            .with_response("Story one".to_string())
            .with_error("boom".to_string());

        assert_eq!(client.complete(&[]).await.unwrap(), "Story one");
        assert!(matches!(
            client.complete(&[]).await.unwrap_err(),
            Error::AiProvider(_)
        ));
        // Should cycle back
        assert_eq!(client.complete(&[]).await.unwrap(), "Story one");
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_image_records_requests_and_failures() {
        let client = MockImageGenerationClient::new().with_failure_for("bad".to_string());
        let good = ImageRequest {
            prompt: "good".to_string(),
            seed: 1337,
            width: None,
            height: 350,
            model: None,
        };
        let bad = ImageRequest {
            prompt: "bad".to_string(),
            ..good.clone()
        };

        let illustration = client.generate_image(&good).await.unwrap();
        assert_eq!(illustration.mime, "image/png");
        assert!(illustration.url.contains("seed=1337"));
        assert!(client.generate_image(&bad).await.is_err());
        assert_eq!(client.get_call_count(), 2);
    }
}
