//! Story illustrator - turns a short prompt into an illustrated story
//!
//! Sends the prompt to a hosted chat-completion service, splits the reply into
//! story lines and pairs every line with a deterministically seeded
//! illustration from a hosted image-generation service.

pub mod ai;
pub mod app;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod models;
pub mod output;
pub mod prompts;
pub mod renderer;
pub mod storyline;
pub mod view;

pub use error::{Error, Result};
