use crate::models::ChatMessage;
use rand::seq::SliceRandom;

pub const STORY_SYSTEM: &str = include_str!("../data/prompts/story_system.txt");

/// Example openings shown as the input placeholder.
pub const PLACEHOLDERS: &[&str] = &[
    "In a faraway land, there was...",
    "Long ago, in a magical world, a story began with...",
    "In a time long past, a tale unfolded about...",
    "Once, in a land filled with wonder, there lived...",
    "A long time ago, in a realm of adventure, the story of... began.",
];

/// The fixed system message that seeds every conversation.
pub fn system_message() -> ChatMessage {
    ChatMessage::system(STORY_SYSTEM.trim_end())
}

/// Pick one placeholder uniformly at random.
pub fn random_placeholder() -> &'static str {
    PLACEHOLDERS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PLACEHOLDERS[0])
}
