//! Prompt templates and question sources

use crate::error::{BatchError, BatchResult};
use psy_table::{clean_text, read_field, read_fields, Row, Table};
use std::collections::HashMap;

/// Marker replaced by the question text
pub const QUESTION_MARKER: &str = "{{question}}";

/// Marker replaced by the answer text
pub const ANSWER_MARKER: &str = "{{answer}}";

/// A prompt template with question and answer markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    /// Wrap template text; `source` names the template in errors
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::MissingAnswerMarker`] when the text has no
    /// answer marker.
    pub fn new(text: impl Into<String>, source: &str) -> BatchResult<Self> {
        let text = text.into();
        if !text.contains(ANSWER_MARKER) {
            return Err(BatchError::MissingAnswerMarker(source.to_string()));
        }
        Ok(Self { text })
    }

    /// Substitute both markers literally
    pub fn render(&self, question: &str, answer: &str) -> String {
        self.text
            .replace(QUESTION_MARKER, question)
            .replace(ANSWER_MARKER, answer)
    }

    /// The raw template text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Where each row's question comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuestionSource {
    /// No question; the marker renders empty
    #[default]
    Absent,
    /// The same question for every row
    Fixed(String),
    /// A per-row lookup by a key column shared with the answer table
    Lookup {
        /// Key column, present in both tables
        key_field: String,
        /// Cleaned key to question text
        questions: HashMap<String, String>,
    },
}

impl QuestionSource {
    /// Load the questions named by a question file, ID and field
    ///
    /// An ID containing `=` selects one fixed row of the question file;
    /// a bare column name makes a per-row lookup keyed by that column.
    pub fn load(question_file: &str, question_id: &str, question_field: &str) -> BatchResult<Self> {
        if question_file.is_empty() {
            return Ok(Self::Absent);
        }
        if question_id.contains('=') {
            let question = read_field(question_file, question_id, question_field)?;
            return Ok(Self::Fixed(question));
        }
        let questions = read_fields(question_file, question_id, question_field)?;
        Ok(Self::Lookup {
            key_field: question_id.to_string(),
            questions,
        })
    }

    /// Check that every answer row can be given a question
    ///
    /// # Errors
    ///
    /// For a lookup, fails when the key column is missing from the answer
    /// table or when any row's key has no question. All rows are checked
    /// before reporting.
    pub fn validate(&self, answers: &Table, answer_file: &str) -> BatchResult<()> {
        let Self::Lookup {
            key_field,
            questions,
        } = self
        else {
            return Ok(());
        };
        if !answers.has_column(key_field) {
            return Err(BatchError::MissingQuestionKey {
                field: key_field.clone(),
                path: answer_file.to_string(),
            });
        }
        let unknown: Vec<String> = answers
            .rows()
            .iter()
            .map(|row| clean_text(row.get(key_field)))
            .filter(|key| !questions.contains_key(key))
            .collect();
        if !unknown.is_empty() {
            return Err(BatchError::UnknownQuestions {
                path: answer_file.to_string(),
                ids: unknown,
            });
        }
        Ok(())
    }

    /// The question for one answer row
    pub fn question_for(&self, row: &Row) -> &str {
        match self {
            Self::Absent => "",
            Self::Fixed(question) => question,
            Self::Lookup {
                key_field,
                questions,
            } => questions
                .get(&clean_text(row.get(key_field)))
                .map_or("", String::as_str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn answers() -> Table {
        Table::from_reader("qid,answer\nq1,yes\nq2,no\n".as_bytes(), "answers.csv").unwrap()
    }

    fn lookup() -> QuestionSource {
        QuestionSource::Lookup {
            key_field: "qid".into(),
            questions: [("q1".to_string(), "Happy?".to_string())].into(),
        }
    }

    #[test]
    fn test_render() {
        let template = Template::new("Q: {{question}}\nA: {{answer}}\n{{answer}}", "p.txt").unwrap();
        assert_eq!(template.render("Why?", "Because"), "Q: Why?\nA: Because\nBecause");
        assert_eq!(template.render("", "x"), "Q: \nA: x\nx");
    }

    #[test]
    fn test_missing_answer_marker() {
        assert!(matches!(
            Template::new("Q: {{question}}", "p.txt"),
            Err(BatchError::MissingAnswerMarker(_))
        ));
    }

    #[test]
    fn test_lookup_validation() {
        let err = lookup().validate(&answers(), "answers.csv").unwrap_err();
        assert!(matches!(err, BatchError::UnknownQuestions { ref ids, .. } if ids == &["q2"]));

        let missing_key = QuestionSource::Lookup {
            key_field: "questionID".into(),
            questions: HashMap::new(),
        };
        assert!(matches!(
            missing_key.validate(&answers(), "answers.csv"),
            Err(BatchError::MissingQuestionKey { .. })
        ));

        assert!(QuestionSource::Fixed("Why?".into())
            .validate(&answers(), "answers.csv")
            .is_ok());
    }

    #[test]
    fn test_question_for() {
        let table = answers();
        let row = &table.rows()[0];
        assert_eq!(lookup().question_for(row), "Happy?");
        assert_eq!(QuestionSource::Fixed("Why?".into()).question_for(row), "Why?");
        assert_eq!(QuestionSource::Absent.question_for(row), "");
    }

    #[test]
    fn test_load_absent() {
        assert_eq!(QuestionSource::load("", "qid", "question").unwrap(), QuestionSource::Absent);
    }
}
