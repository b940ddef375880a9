use super::html::render_page;
use super::StoryPublisher;
use crate::ai::mime::extension_for_mime;
use crate::models::{DisplayUnit, ImageStatus, Storyboard};
use crate::Result;
use async_trait::async_trait;
use chrono::Local;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;
use uuid::Uuid;

/// Writes each storyboard into its own numbered directory of a session folder.
pub struct FilePublisher {
    session_dir: PathBuf,
    published: AtomicUsize,
}

impl FilePublisher {
    /// Create `<output_dir>/<date>_<session uuid>/`.
    pub fn new(output_dir: &Path) -> Result<Self> {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let session_id = Uuid::new_v4();
        let session_dir = output_dir.join(format!("{}_{}", date, session_id));

        fs::create_dir_all(&session_dir)?;
        info!("Created output directory: {}", session_dir.display());

        Ok(Self {
            session_dir,
            published: AtomicUsize::new(0),
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn image_file_name(unit: &DisplayUnit, mime: &str) -> String {
        format!("episode-{}.{}", unit.episode, extension_for_mime(mime))
    }
}

#[async_trait]
impl StoryPublisher for FilePublisher {
    async fn publish(&self, board: &Storyboard) -> Result<String> {
        let n = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        let story_dir = self.session_dir.join(format!("story-{}", n));
        let images_dir = story_dir.join("images");
        fs::create_dir_all(&images_dir)?;

        let mut local_images = HashMap::new();
        for unit in &board.units {
            if let ImageStatus::Ready { illustration } = &unit.status {
                let file_name = Self::image_file_name(unit, &illustration.mime);
                fs::write(images_dir.join(&file_name), &illustration.bytes)?;
                local_images.insert(unit.episode, format!("images/{}", file_name));
            }
        }

        let json = serde_json::to_string_pretty(board)?;
        fs::write(story_dir.join("story.json"), json)?;

        let page = render_page(board, |unit| local_images.get(&unit.episode).cloned());
        fs::write(story_dir.join("story.html"), page)?;

        info!(
            "Saved story with {} episodes ({} illustrations) to {}",
            board.units.len(),
            local_images.len(),
            story_dir.display()
        );

        Ok(story_dir.display().to_string())
    }
}
