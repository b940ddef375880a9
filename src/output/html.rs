use crate::models::{DisplayUnit, ImageStatus, Storyboard};
use maud::{html, Markup, DOCTYPE};

fn episode(unit: &DisplayUnit, src: Option<String>) -> Markup {
    html! {
        section class="episode" {
            figure {
                @match (&unit.status, src) {
                    (ImageStatus::Failed { reason }, _) => {
                        p class="image-error" { "Illustration unavailable: " (reason) }
                    }
                    (_, Some(src)) => {
                        img src=(src) alt=(unit.line.as_str()) height=(unit.image.height);
                    }
                    (_, None) => {
                        p class="image-pending" { "Illustration pending" }
                    }
                }
                figcaption { (unit.label()) }
            }
            blockquote {
                p { "\"" (unit.line.as_str()) "\"" }
            }
        }
    }
}

/// Render `board` as a standalone page. `image_src` maps a unit to the
/// `src` used for its illustration (a local file or the remote URL).
pub fn render_page<F>(board: &Storyboard, image_src: F) -> String
where
    F: Fn(&DisplayUnit) -> Option<String>,
{
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Story: " (board.prompt) }
            }
            body {
                main {
                    h1 { "Story: " (board.prompt) }
                    @for unit in &board.units {
                        (episode(unit, image_src(unit)))
                    }
                }
            }
        }
    };
    markup.into_string()
}
