//! Numeric scores heuristically parsed from completion text

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which numbers to take from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// The first number in the text
    First,
    /// The last number in the text
    #[default]
    Last,
    /// Every number, in text order
    All,
    /// No scores
    None,
}

impl Selection {
    /// Lowercase name of the policy
    pub fn as_str(self) -> &'static str {
        match self {
            Selection::First => "first",
            Selection::Last => "last",
            Selection::All => "all",
            Selection::None => "none",
        }
    }

    /// Parse a stored policy, treating unknown values as [`Selection::None`]
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Selection::None)
    }
}

impl FromStr for Selection {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Selection::First),
            "last" => Ok(Selection::Last),
            "all" => Ok(Selection::All),
            "none" => Ok(Selection::None),
            _ => Err(BatchError::InvalidSelection(s.to_string())),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse one whitespace-delimited token as a score
///
/// The token must start with an ASCII digit or a sign. Trailing characters
/// that are not ASCII digits are stripped before parsing, so "7." and "8/10,"
/// lose their punctuation while "abc" is rejected outright.
pub fn parse_score(token: &str) -> Option<f32> {
    let first = token.bytes().next()?;
    if first != b'-' && first != b'+' && !first.is_ascii_digit() {
        return None;
    }
    let trimmed = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    trimmed.parse::<f32>().ok().filter(|score| score.is_finite())
}

/// Extract scores from text under a selection policy
///
/// `First` and `Last` yield at most one score; a text without numbers yields
/// none. Unparseable tokens are skipped.
pub fn select_scores(text: &str, selection: Selection) -> Vec<f32> {
    let mut tokens = text.split_whitespace();
    match selection {
        Selection::None => Vec::new(),
        Selection::First => tokens.find_map(parse_score).into_iter().collect(),
        Selection::Last => tokens.rev().find_map(parse_score).into_iter().collect(),
        Selection::All => tokens.filter_map(parse_score).collect(),
    }
}

/// Render a score the way result columns store it, e.g. "3.000000"
pub fn format_score(score: f32) -> String {
    format!("{score:.6}")
}
