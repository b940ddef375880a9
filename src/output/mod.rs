//! Publishing of finished storyboards
//!
//! Writes the storyboard as JSON, an HTML page and the downloaded
//! illustrations, or records it in memory for dry runs.

pub mod files;
pub mod html;
pub mod mock;

pub use files::FilePublisher;
pub use mock::MockPublisher;

use crate::models::Storyboard;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StoryPublisher: Send + Sync {
    /// Persist `board` and return where it was published.
    async fn publish(&self, board: &Storyboard) -> Result<String>;
}
