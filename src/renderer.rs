//! Story line rendering: turns the latest assistant reply into display units.

use crate::models::{
    ChatMessage, DisplayUnit, Illustration, ImageRequest, ImageSettings, ImageStatus, Role,
};
use crate::storyline::split_story_lines;
use crate::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// One image fetch to start, tagged with the render it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub generation: u64,
    pub index: usize,
    pub request: ImageRequest,
}

pub struct StoryRenderer {
    updates: watch::Receiver<Option<ChatMessage>>,
    settings: ImageSettings,
    units: Vec<DisplayUnit>,
    generation: u64,
}

impl StoryRenderer {
    pub fn new(updates: watch::Receiver<Option<ChatMessage>>, settings: ImageSettings) -> Self {
        Self {
            updates,
            settings,
            units: Vec::new(),
            generation: 0,
        }
    }

    /// Recompute the units if an assistant reply landed since the last call.
    ///
    /// Returns `true` when a new render was produced.
    pub fn refresh(&mut self) -> bool {
        if !self.updates.has_changed().unwrap_or(false) {
            return false;
        }

        let tail = self.updates.borrow_and_update().clone();
        match tail {
            Some(message) if message.role == Role::Assistant => {
                self.render(&message.content);
                true
            }
            _ => false,
        }
    }

    fn render(&mut self, reply: &str) {
        self.generation += 1;
        self.units = split_story_lines(reply)
            .into_iter()
            .enumerate()
            .map(|(index, line)| DisplayUnit {
                episode: index + 1,
                image: self.settings.request_for(&line),
                line,
                status: ImageStatus::Pending,
            })
            .collect();

        if self.units.is_empty() {
            warn!("Assistant reply contained no story lines");
        } else {
            info!(
                "Rendered {} story lines (render #{})",
                self.units.len(),
                self.generation
            );
        }
    }

    pub fn units(&self) -> &[DisplayUnit] {
        &self.units
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn image_requests(&self) -> Vec<PendingImage> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.status.is_pending())
            .map(|(index, unit)| PendingImage {
                generation: self.generation,
                index,
                request: unit.image.clone(),
            })
            .collect()
    }

    /// Record an image outcome. Returns the updated unit, or `None` when the
    /// result belongs to an older render.
    pub fn apply_image(
        &mut self,
        generation: u64,
        index: usize,
        result: Result<Illustration>,
    ) -> Option<&DisplayUnit> {
        if generation != self.generation {
            debug!(
                "Dropping image for render #{} (current render is #{})",
                generation, self.generation
            );
            return None;
        }

        let unit = self.units.get_mut(index)?;
        unit.status = match result {
            Ok(illustration) => ImageStatus::Ready { illustration },
            Err(e) => {
                warn!("{} illustration failed: {}", unit.label(), e);
                ImageStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        Some(&*unit)
    }

    pub fn is_settled(&self) -> bool {
        self.units.iter().all(|unit| !unit.status.is_pending())
    }
}
