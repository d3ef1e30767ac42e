//! Run parameters and their batch-metadata encoding

use crate::error::{BatchError, BatchResult};
use crate::score::Selection;
use psy_table::parse_row_id;
use std::collections::BTreeMap;
use std::path::Path;

/// Default score column name
pub const DEFAULT_SCORE_FIELD: &str = "score";

/// Default model ID for templated runs
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default sub-batch size for parallel runs
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Batch metadata keys
pub mod keys {
    /// Output CSV path
    pub const OUTPUT_FILE: &str = "output_file";
    /// Score column name
    pub const SCORE_FIELD: &str = "score_field";
    /// Score selection policy
    pub const SCORE_SELECT: &str = "score_select";
    /// Prompt template path
    pub const PROMPT_FILE: &str = "prompt_file";
    /// System message path
    pub const SYSTEM_FILE: &str = "system_file";
    /// Answer table path
    pub const ANSWER_FILE: &str = "answer_file";
    /// Answer column
    pub const ANSWER_FIELD: &str = "answer_field";
    /// Question table path
    pub const QUESTION_FILE: &str = "question_file";
    /// Question column
    pub const QUESTION_FIELD: &str = "question_field";
    /// Question ID or lookup key
    pub const QUESTION_ID: &str = "question_id";
    /// Line-delimited input payload path
    pub const INPUT_FILE: &str = "input_file";
    /// Model ID
    pub const MODEL: &str = "model";
}

/// Which answer rows a run covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RowSelection {
    /// Every row
    #[default]
    All,
    /// One uniformly selected row
    Random,
    /// The first row whose column equals a value
    Id {
        /// Column name
        name: String,
        /// Column value
        value: String,
    },
}

impl RowSelection {
    /// Parse an answer ID: "" for all rows, "random", or `name=value`
    pub fn parse(answer_id: &str) -> BatchResult<Self> {
        match answer_id {
            "" => Ok(Self::All),
            "random" => Ok(Self::Random),
            id => {
                let (name, value) =
                    parse_row_id(id).map_err(|_| BatchError::InvalidRowId(id.to_string()))?;
                Ok(Self::Id {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            }
        }
    }
}

/// Everything needed to build, run and finish a templated completion run
#[derive(Debug, Clone, PartialEq)]
pub struct ChatParameters {
    /// Line-delimited request payload path (batch runs)
    pub input_file: String,
    /// Result CSV path
    pub output_file: String,
    /// Optional system message file
    pub system_file: String,
    /// Prompt template file
    pub prompt_file: String,
    /// Optional question table
    pub question_file: String,
    /// Question column in the question table
    pub question_field: String,
    /// `name=value` for one fixed question, or a key column for per-row lookup
    pub question_id: String,
    /// Answer table
    pub answer_file: String,
    /// Answer column
    pub answer_field: String,
    /// Row selection
    pub answer_id: RowSelection,
    /// Score column name, or prefix when rows carry several scores
    pub score_field: String,
    /// Score selection policy
    pub score_select: Selection,
    /// Model ID
    pub model: String,
    /// Sampling temperature; zero leaves the provider default
    pub temperature: f32,
    /// Token cap; zero means unlimited
    pub max_tokens: u32,
    /// Concurrent requests per sub-batch
    pub batch_size: usize,
}

impl Default for ChatParameters {
    fn default() -> Self {
        Self {
            input_file: String::new(),
            output_file: String::new(),
            system_file: String::new(),
            prompt_file: String::new(),
            question_file: String::new(),
            question_field: String::new(),
            question_id: String::new(),
            answer_file: String::new(),
            answer_field: String::new(),
            answer_id: RowSelection::All,
            score_field: DEFAULT_SCORE_FIELD.to_string(),
            score_select: Selection::Last,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ChatParameters {
    /// Input payload path: the explicit input file, or the answer file
    /// with its `.csv` suffix replaced by `.jsonl`
    pub fn input_path(&self) -> String {
        if !self.input_file.is_empty() {
            return self.input_file.clone();
        }
        let stem = self
            .answer_file
            .strip_suffix(".csv")
            .unwrap_or(&self.answer_file);
        format!("{stem}.jsonl")
    }

    /// File name used when uploading the input payload
    pub fn input_name(&self) -> String {
        let path = self.input_path();
        Path::new(&path)
            .file_name()
            .map_or_else(|| path.clone(), |name| name.to_string_lossy().into_owned())
    }

    /// Batch metadata that lets a later invocation finish the run
    ///
    /// Empty values are omitted.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        [
            (keys::OUTPUT_FILE, self.output_file.as_str()),
            (keys::SCORE_FIELD, self.score_field.as_str()),
            (keys::SCORE_SELECT, self.score_select.as_str()),
            (keys::PROMPT_FILE, self.prompt_file.as_str()),
            (keys::SYSTEM_FILE, self.system_file.as_str()),
            (keys::ANSWER_FILE, self.answer_file.as_str()),
            (keys::ANSWER_FIELD, self.answer_field.as_str()),
            (keys::QUESTION_FILE, self.question_file.as_str()),
            (keys::QUESTION_FIELD, self.question_field.as_str()),
            (keys::QUESTION_ID, self.question_id.as_str()),
            (keys::INPUT_FILE, self.input_file.as_str()),
            (keys::MODEL, self.model.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    /// Rebuild parameters from batch metadata
    ///
    /// A missing score field means "score"; a missing score selection means
    /// "last", and an unrecognized one selects no scores.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::MissingMetadata`] when the output file is absent.
    pub fn from_metadata(batch_id: &str, metadata: &BTreeMap<String, String>) -> BatchResult<Self> {
        let get = |key: &str| {
            metadata
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_default()
        };
        let output_file = get(keys::OUTPUT_FILE);
        if output_file.is_empty() {
            return Err(BatchError::MissingMetadata {
                key: keys::OUTPUT_FILE,
                batch_id: batch_id.to_string(),
            });
        }
        let defaults = Self::default();
        let score_field = Some(get(keys::SCORE_FIELD))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.score_field);
        let score_select = match get(keys::SCORE_SELECT).as_str() {
            "" => Selection::Last,
            value => Selection::parse_lenient(value),
        };
        let model = Some(get(keys::MODEL))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.model);
        Ok(Self {
            input_file: get(keys::INPUT_FILE),
            output_file,
            system_file: get(keys::SYSTEM_FILE),
            prompt_file: get(keys::PROMPT_FILE),
            question_file: get(keys::QUESTION_FILE),
            question_field: get(keys::QUESTION_FIELD),
            question_id: get(keys::QUESTION_ID),
            answer_file: get(keys::ANSWER_FILE),
            answer_field: get(keys::ANSWER_FIELD),
            score_field,
            score_select,
            model,
            ..defaults
        })
    }
}
