//! Splitting of assistant replies into story lines.

use crate::models::StoryLine;

const LINE_TERMINATORS: [char; 2] = ['.', '\n'];

/// Split `reply` on periods and newlines, keeping trimmed non-empty fragments
/// in their original order.
pub fn split_story_lines(reply: &str) -> Vec<StoryLine> {
    reply
        .split(LINE_TERMINATORS)
        .filter_map(StoryLine::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(reply: &str) -> Vec<String> {
        split_story_lines(reply)
            .iter()
            .map(|line| line.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_splits_on_period_and_newline() {
        assert_eq!(
            texts("A cat woke up.\nIt stretched. "),
            vec!["A cat woke up", "It stretched"]
        );
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        assert_eq!(
            texts("Rain fell\nRain fell. The end"),
            vec!["Rain fell", "Rain fell", "The end"]
        );
    }

    #[test]
    fn test_drops_blank_fragments() {
        assert_eq!(texts("...\n\n  .\t\n"), Vec::<String>::new());
        assert_eq!(texts(""), Vec::<String>::new());
    }

    #[test]
    fn test_handles_carriage_returns() {
        assert_eq!(texts("One\r\nTwo\r\n"), vec!["One", "Two"]);
    }

    #[test]
    fn test_other_punctuation_stays_inside_lines() {
        assert_eq!(
            texts("Whiskers, the cat, purred! Max barked? Yes."),
            vec!["Whiskers, the cat, purred! Max barked? Yes"]
        );
    }

    #[test]
    fn test_six_line_story() {
        let reply = "In a sunny garden, a cat named Whiskers wandered.\n\
                     Whiskers spotted a dog named Max.\n\
                     Whiskers approached Max.\n\
                     Max greeted Whiskers.\n\
                     They explored the garden together.\n\
                     As the sun set, they rested side by side.";
        let lines = split_story_lines(reply);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5].as_str(), "As the sun set, they rested side by side");
    }
}
