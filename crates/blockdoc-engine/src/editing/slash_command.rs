use regex::Regex;
use std::sync::OnceLock;

use crate::editing::markup;
use crate::editing::table::TableSize;

/// A structural command typed into a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    /// `/link...`: open the link dialog for the block and drop the typed text.
    Link,
    /// `/table`, `/table 3x4`, `/table 3×4`: width first, then height.
    Table(TableSize),
}

fn table_regex() -> &'static Regex {
    static TABLE_REGEX: OnceLock<Regex> = OnceLock::new();
    TABLE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^/table\s*(?:(\d*)\s*[x×]\s*(\d*))?$").expect("Invalid table command regex")
    })
}

/// Inspect block content for a slash command.
///
/// Pure over its input: text that does not start with a recognized command
/// yields `None`, so re-running after the command has been consumed is a no-op.
pub fn detect(content: &str) -> Option<SlashCommand> {
    let plain = markup::to_plain_text(content);
    let text = plain.trim();

    if text.to_lowercase().starts_with("/link") {
        return Some(SlashCommand::Link);
    }

    let captures = table_regex().captures(text)?;
    let dimension = |index| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(3)
    };
    let columns = dimension(1);
    let rows = dimension(2);
    Some(SlashCommand::Table(TableSize::new(rows, columns)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/link")]
    #[case("/LINK")]
    #[case("/linkedin")]
    #[case("<b>/link</b> extra")]
    #[case("  /link  ")]
    fn test_link_prefix(#[case] content: &str) {
        assert_eq!(detect(content), Some(SlashCommand::Link));
    }

    #[rstest]
    #[case("/table", 3, 3)]
    #[case("/table 2x4", 4, 2)]
    #[case("/TABLE 5X1", 1, 5)]
    #[case("/table 3×4", 4, 3)]
    #[case("/table3x3", 3, 3)]
    #[case("/table 0x0", 3, 3)]
    #[case("/table 2x", 3, 2)]
    #[case("/table x7", 7, 3)]
    #[case("<i>/table 2 x 2</i>", 2, 2)]
    fn test_table_command(#[case] content: &str, #[case] rows: usize, #[case] columns: usize) {
        assert_eq!(
            detect(content),
            Some(SlashCommand::Table(TableSize::new(rows, columns)))
        );
    }

    #[rstest]
    #[case("")]
    #[case("hello /table")]
    #[case("/tables")]
    #[case("/table 2x4 please")]
    #[case("/image")]
    #[case("link")]
    fn test_unrecognized_text(#[case] content: &str) {
        assert_eq!(detect(content), None);
    }
}
