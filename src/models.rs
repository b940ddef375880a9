//! Data models and structures
//!
//! Defines the conversation messages, the derived story display units and
//! the runtime configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One trimmed, non-empty fragment of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryLine(String);

impl StoryLine {
    /// Returns `None` when the fragment is empty after trimming.
    pub fn new(fragment: &str) -> Option<Self> {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoryLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters sent to the image generation service for one story line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illustration {
    pub url: String,
    pub mime: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Ready { illustration: Illustration },
    Failed { reason: String },
}

impl ImageStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ImageStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUnit {
    /// 1-based position in the story.
    pub episode: usize,
    pub line: StoryLine,
    pub image: ImageRequest,
    pub status: ImageStatus,
}

impl DisplayUnit {
    pub fn label(&self) -> String {
        format!("Episode: {}", self.episode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storyboard {
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub units: Vec<DisplayUnit>,
}

/// Image settings applied to every story line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSettings {
    pub seed: u64,
    pub width: Option<u32>,
    pub height: u32,
    pub model: Option<String>,
}

impl ImageSettings {
    pub fn request_for(&self, line: &StoryLine) -> ImageRequest {
        ImageRequest {
            prompt: line.as_str().trim().to_string(),
            seed: self.seed,
            width: self.width,
            height: self.height,
            model: self.model.clone(),
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_IMAGE_SEED,
            width: None,
            height: DEFAULT_IMAGE_HEIGHT,
            model: None,
        }
    }
}

pub const DEFAULT_IMAGE_SEED: u64 = 1337;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 350;

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub text_base_url: String,
    pub image_base_url: String,
    pub text_model: String,
    pub image: ImageSettings,
    pub request_timeout_secs: u64,
    pub image_retries: usize,
    pub image_retry_delay_ms: u64,
    pub discard_stale_replies: bool,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, applying defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            text_base_url: lookup("POLLINATIONS_TEXT_URL")
                .unwrap_or_else(|| "https://text.pollinations.ai".to_string()),
            image_base_url: lookup("POLLINATIONS_IMAGE_URL")
                .unwrap_or_else(|| "https://image.pollinations.ai".to_string()),
            text_model: lookup("STORY_TEXT_MODEL").unwrap_or_else(|| "openai".to_string()),
            image: ImageSettings {
                seed: parse_var(&lookup, "STORY_IMAGE_SEED")?.unwrap_or(DEFAULT_IMAGE_SEED),
                width: parse_var(&lookup, "STORY_IMAGE_WIDTH")?,
                height: parse_var(&lookup, "STORY_IMAGE_HEIGHT")?.unwrap_or(DEFAULT_IMAGE_HEIGHT),
                model: lookup("STORY_IMAGE_MODEL").filter(|m| !m.trim().is_empty()),
            },
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS")?.unwrap_or(60),
            image_retries: parse_var(&lookup, "IMAGE_RETRIES")?.unwrap_or(0),
            image_retry_delay_ms: parse_var(&lookup, "IMAGE_RETRY_DELAY_MS")?.unwrap_or(2000),
            discard_stale_replies: parse_bool(&lookup, "DISCARD_STALE_REPLIES")?.unwrap_or(true),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            dry_run: parse_bool(&lookup, "DRY_RUN")?.unwrap_or(false),
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> crate::Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            crate::Error::Config(format!("{} has invalid value '{}'", key, raw))
        }),
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> crate::Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(crate::Error::Config(format!(
                "{} has invalid boolean value '{}'",
                key, value
            ))),
        },
    }
}
