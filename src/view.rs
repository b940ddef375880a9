//! Plain-text rendering of the story for the terminal.

use crate::models::{DisplayUnit, ImageStatus};

pub fn heading(prompt: &str) -> String {
    format!("Story: {}", prompt)
}

pub fn input_prompt(placeholder: &str) -> String {
    format!("\n({})\n> ", placeholder)
}

pub fn image_status(unit: &DisplayUnit) -> String {
    match &unit.status {
        ImageStatus::Pending => "[illustration pending]".to_string(),
        ImageStatus::Ready { illustration } => format!("[illustration] {}", illustration.url),
        ImageStatus::Failed { reason } => format!("[illustration failed] {}", reason),
    }
}

pub fn unit(unit: &DisplayUnit) -> String {
    format!(
        "{}\n  \"{}\"\n  {}\n",
        unit.label(),
        unit.line,
        image_status(unit)
    )
}

/// Heading followed by every display unit in order.
pub fn board(prompt: Option<&str>, units: &[DisplayUnit]) -> String {
    let mut out = String::new();
    if let Some(prompt) = prompt {
        out.push_str(&heading(prompt));
        out.push_str("\n\n");
    }
    for display_unit in units {
        out.push_str(&unit(display_unit));
        out.push('\n');
    }
    out
}
