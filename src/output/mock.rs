use super::StoryPublisher;
use crate::models::Storyboard;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory publisher used for dry runs and tests.
#[derive(Clone)]
pub struct MockPublisher {
    boards: Arc<Mutex<Vec<Storyboard>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            boards: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_publish_count(&self) -> usize {
        self.boards.lock().unwrap().len()
    }

    pub fn published(&self) -> Vec<Storyboard> {
        self.boards.lock().unwrap().clone()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryPublisher for MockPublisher {
    async fn publish(&self, board: &Storyboard) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Io(std::io::Error::other("Mock failure")));
        }

        let mut boards = self.boards.lock().unwrap();
        boards.push(board.clone());
        Ok(format!("memory://story-{}", boards.len()))
    }
}
