//! Writing completions and scores back onto result tables

use crate::builder::CHAT_ID_FIELD;
use crate::score::format_score;
use psy_table::Table;
use std::collections::HashMap;

/// Column holding each row's completion text or error
pub const COMPLETION_FIELD: &str = "completion";

/// The result of one correlation ID, ready to be written to its row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Completion text, or error text for a failure
    pub completion: String,
    /// Extracted scores; always empty for a failure
    pub scores: Vec<f32>,
    /// Whether the completion column holds an error
    pub failed: bool,
}

impl Outcome {
    /// A successful completion with its scores
    pub fn success(completion: impl Into<String>, scores: Vec<f32>) -> Self {
        Self {
            completion: completion.into(),
            scores,
            failed: false,
        }
    }

    /// A failure; the error text takes the completion's place
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            completion: error.into(),
            scores: Vec::new(),
            failed: true,
        }
    }
}

/// Counts from a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Rows that received an outcome
    pub rows: usize,
    /// Rows whose outcome was a failure
    pub errors: usize,
    /// Most scores on any row
    pub max_scores: usize,
}

/// Name of the score column for the `index`th score (0-based)
///
/// A single `score_field` column is used when no row carries more than one
/// score; otherwise columns are numbered from 1.
pub fn score_column(score_field: &str, index: usize, max_scores: usize) -> String {
    if max_scores > 1 {
        format!("{score_field}{}", index + 1)
    } else {
        score_field.to_string()
    }
}

/// Write outcomes onto the rows whose `chatID` they belong to
///
/// Rows with an empty or unknown `chatID` are left untouched. The
/// `completion` column is always added; score columns are sized to the
/// largest score count seen.
pub fn merge_outcomes(
    table: &mut Table,
    outcomes: &HashMap<String, Outcome>,
    score_field: &str,
) -> MergeSummary {
    let matched = |id: &str| (!id.is_empty()).then(|| outcomes.get(id)).flatten();
    let max_scores = table
        .rows()
        .iter()
        .filter_map(|row| matched(row.get(CHAT_ID_FIELD)))
        .map(|outcome| outcome.scores.len())
        .max()
        .unwrap_or(0);

    table.add_column(COMPLETION_FIELD);
    for index in 0..max_scores {
        table.add_column(score_column(score_field, index, max_scores));
    }

    let mut summary = MergeSummary {
        max_scores,
        ..Default::default()
    };
    for row in table.rows_mut() {
        let Some(outcome) = matched(row.get(CHAT_ID_FIELD)) else {
            continue;
        };
        summary.rows += 1;
        if outcome.failed {
            summary.errors += 1;
        }
        row.set(COMPLETION_FIELD, outcome.completion.as_str());
        for (index, score) in outcome.scores.iter().enumerate() {
            row.set(score_column(score_field, index, max_scores), format_score(*score));
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::from_reader(
            "id,answer,chatID\n1,a,c1\n2,b,c2\n3,,\n4,d,c4\n".as_bytes(),
            "out.csv",
        )
        .unwrap()
    }

    #[test]
    fn test_single_score_column() {
        let mut table = table();
        let outcomes = [
            ("c1".to_string(), Outcome::success("Score 3", vec![3.0])),
            ("c2".to_string(), Outcome::failure("API error 500: oops")),
        ]
        .into();
        let summary = merge_outcomes(&mut table, &outcomes, "score");

        assert_eq!(summary, MergeSummary { rows: 2, errors: 1, max_scores: 1 });
        assert_eq!(table.columns(), ["id", "answer", "chatID", "completion", "score"]);
        assert_eq!(table.rows()[0].get("score"), "3.000000");
        assert_eq!(table.rows()[1].get("completion"), "API error 500: oops");
        assert_eq!(table.rows()[1].get("score"), "");
        assert_eq!(table.rows()[2].get("completion"), "");
        assert!(!table.rows()[3].contains("completion"));
    }

    #[test]
    fn test_numbered_score_columns() {
        let mut table = table();
        let outcomes = [
            ("c1".to_string(), Outcome::success("7", vec![7.0])),
            ("c4".to_string(), Outcome::success("4 and 5", vec![4.0, 5.0])),
        ]
        .into();
        let summary = merge_outcomes(&mut table, &outcomes, "score");

        assert_eq!(summary.max_scores, 2);
        assert_eq!(
            table.columns(),
            ["id", "answer", "chatID", "completion", "score1", "score2"]
        );
        assert_eq!(table.rows()[0].get("score1"), "7.000000");
        assert_eq!(table.rows()[0].get("score2"), "");
        assert!(!table.rows()[0].contains("score"));
        assert_eq!(table.rows()[3].get("score2"), "5.000000");
    }

    #[test]
    fn test_no_scores() {
        let mut table = table();
        let outcomes = [("c1".to_string(), Outcome::success("fine", Vec::new()))].into();
        merge_outcomes(&mut table, &outcomes, "score");
        assert_eq!(table.columns(), ["id", "answer", "chatID", "completion"]);
    }
}
