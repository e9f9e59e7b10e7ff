//! A1 cell notation (`E4` -> row 3, column 4, both 0-based)

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("valid A1 pattern"))
}

/// Parse an A1 reference into 0-based `(row, column)`.
pub fn parse_a1(reference: &str) -> Option<(usize, usize)> {
    let caps = pattern().captures(reference.trim())?;
    let column = caps[1]
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    let row: usize = caps[2].parse().ok()?;
    Some((row - 1, column - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("E4"), Some((3, 4)));
        assert_eq!(parse_a1("a1"), Some((0, 0)));
        assert_eq!(parse_a1("$AA$10"), Some((9, 26)));
        assert_eq!(parse_a1("E0"), None);
        assert_eq!(parse_a1("4E"), None);
    }
}
