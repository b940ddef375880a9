//! AI service integration for story text and illustrations
//!
//! Provides interfaces to the hosted chat-completion and image-generation
//! services used to write a story and illustrate each of its lines.

pub mod mime;
pub mod mock;
pub mod pollinations;

pub use mock::{MockChatClient, MockImageGenerationClient};
pub use pollinations::{PollinationsChatClient, PollinationsImageClient};

use crate::models::{ChatMessage, Illustration, ImageRequest};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send the whole conversation history and return the assistant reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Public URL of the illustration for `request`.
    fn image_url(&self, request: &ImageRequest) -> Result<String>;

    async fn generate_image(&self, request: &ImageRequest) -> Result<Illustration>;
}
