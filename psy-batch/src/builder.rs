//! Turns an answer table and a prompt template into correlation-tagged chats

use crate::chat::{new_chat_id, Chat};
use crate::error::{BatchError, BatchResult};
use crate::params::{ChatParameters, RowSelection};
use crate::template::{QuestionSource, Template};
use psy_core::Gateway;
use psy_table::{clean_text, Table, TextCache};
use tracing::{debug, info};

/// Column holding each row's correlation ID
pub const CHAT_ID_FIELD: &str = "chatID";

/// Load the inputs named by `params` and build one chat per selected row
///
/// Every check that can fail runs before the first chat is built; no
/// completion requests are sent. The returned table carries a `chatID`
/// column linking rows to chats.
///
/// # Errors
///
/// Fails on an unrecognized model, unreadable or malformed files, a missing
/// answer or question key column, unresolvable question keys, or an answer
/// ID that matches no row.
pub async fn build_requests<G: Gateway + ?Sized>(
    gateway: &G,
    params: &ChatParameters,
    cache: &mut TextCache,
) -> BatchResult<(Vec<Chat>, Table)> {
    if !gateway.is_valid_model(&params.model).await {
        return Err(BatchError::UnknownModel(params.model.clone()));
    }
    let system = cache.read(&params.system_file)?.to_string();
    let template = Template::new(cache.read(&params.prompt_file)?, &params.prompt_file)?;
    let questions = QuestionSource::load(
        &params.question_file,
        &params.question_id,
        &params.question_field,
    )?;
    let mut answers = Table::load(&params.answer_file)?;
    let chats = build_chats(&mut answers, params, &template, &system, &questions)?;
    Ok((chats, answers))
}

/// Build one chat per selected row of an already loaded answer table
///
/// Rows with a blank answer get an empty `chatID` and no chat; they stay in
/// the table so they round-trip to the output unchanged.
pub fn build_chats(
    answers: &mut Table,
    params: &ChatParameters,
    template: &Template,
    system: &str,
    questions: &QuestionSource,
) -> BatchResult<Vec<Chat>> {
    if !answers.has_column(&params.answer_field) {
        return Err(BatchError::MissingAnswerField {
            field: params.answer_field.clone(),
            path: params.answer_file.clone(),
        });
    }
    questions.validate(answers, &params.answer_file)?;

    let selected: Vec<usize> = match &params.answer_id {
        RowSelection::All => (0..answers.row_count()).collect(),
        RowSelection::Random => {
            let index = answers
                .random_position()
                .ok_or_else(|| BatchError::EmptyTable(params.answer_file.clone()))?;
            vec![index]
        }
        RowSelection::Id { name, value } => {
            if !answers.has_column(name) {
                return Err(BatchError::MissingRowField {
                    field: name.clone(),
                    path: params.answer_file.clone(),
                });
            }
            let index = answers
                .position(name, value)
                .ok_or_else(|| BatchError::RowNotFound {
                    id: format!("{name}={value}"),
                    path: params.answer_file.clone(),
                })?;
            vec![index]
        }
    };

    answers.add_column(CHAT_ID_FIELD);
    let mut chats = Vec::with_capacity(selected.len());
    for index in selected {
        let row = &mut answers.rows_mut()[index];
        let answer = clean_text(row.get(&params.answer_field));
        if answer.is_empty() {
            row.set(CHAT_ID_FIELD, "");
            continue;
        }
        let id = new_chat_id();
        row.set(CHAT_ID_FIELD, id.as_str());
        let prompt = template.render(questions.question_for(row), &answer);
        debug!(chat_id = %id, row = index, "built chat request");
        chats.push(Chat::new(
            id,
            system,
            &prompt,
            &params.model,
            params.temperature,
            params.max_tokens,
        ));
    }
    info!(
        chats = chats.len(),
        rows = answers.row_count(),
        "built chat requests"
    );
    Ok(chats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn params() -> ChatParameters {
        ChatParameters {
            answer_file: "answers.csv".into(),
            answer_field: "answer".into(),
            ..Default::default()
        }
    }

    fn table(text: &str) -> Table {
        Table::from_reader(text.as_bytes(), "answers.csv").unwrap()
    }

    fn template() -> Template {
        Template::new("Q: {{question}} A: {{answer}}", "prompt.txt").unwrap()
    }

    #[test]
    fn test_blank_answers_are_skipped_but_kept() {
        let mut answers = table("id,answer\n1,yes\n2,  \n3,no\n4,\n5,maybe\n");
        let chats = build_chats(&mut answers, &params(), &template(), "", &QuestionSource::Absent)
            .unwrap();

        assert_eq!(chats.len(), 3);
        assert_eq!(answers.row_count(), 5);
        assert!(answers.has_column(CHAT_ID_FIELD));
        assert_eq!(answers.rows()[1].get(CHAT_ID_FIELD), "");
        assert_eq!(answers.rows()[3].get(CHAT_ID_FIELD), "");

        let ids: HashSet<_> = chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        for (row, chat) in [0, 2, 4].into_iter().zip(&chats) {
            assert_eq!(answers.rows()[row].get(CHAT_ID_FIELD), chat.id);
            assert_eq!(chat.request.user.as_deref(), Some(chat.id.as_str()));
        }
        assert_eq!(chats[0].prompt(), "Q:  A: yes");
    }

    #[test]
    fn test_question_lookup_and_system_message() {
        let mut answers = table("qid,answer\nq1,  yes \nq2,no\n");
        let questions = QuestionSource::Lookup {
            key_field: "qid".into(),
            questions: [
                ("q1".to_string(), "Happy?".to_string()),
                ("q2".to_string(), "Sad?".to_string()),
            ]
            .into(),
        };
        let chats = build_chats(&mut answers, &params(), &template(), "Be terse.", &questions)
            .unwrap();
        assert_eq!(chats[0].prompt(), "Q: Happy? A: yes");
        assert_eq!(chats[1].prompt(), "Q: Sad? A: no");
        assert_eq!(chats[0].request.messages[0].content, "Be terse.");
    }

    #[test]
    fn test_unknown_question_aborts_before_any_chat() {
        let mut answers = table("qid,answer\nq1,yes\nq9,no\n");
        let questions = QuestionSource::Lookup {
            key_field: "qid".into(),
            questions: [("q1".to_string(), "Happy?".to_string())].into(),
        };
        let err = build_chats(&mut answers, &params(), &template(), "", &questions).unwrap_err();
        assert!(matches!(err, BatchError::UnknownQuestions { .. }));
        assert!(!answers.has_column(CHAT_ID_FIELD));
    }

    #[test]
    fn test_row_selection() {
        let mut answers = table("id,answer\n1,yes\n2,no\n");
        let params = ChatParameters {
            answer_id: RowSelection::Id {
                name: "id".into(),
                value: "2".into(),
            },
            ..params()
        };
        let chats = build_chats(&mut answers, &params, &template(), "", &QuestionSource::Absent)
            .unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].prompt(), "Q:  A: no");
        assert_eq!(answers.rows()[0].get(CHAT_ID_FIELD), "");

        let params = ChatParameters {
            answer_id: RowSelection::Random,
            ..params
        };
        let chats = build_chats(&mut answers, &params, &template(), "", &QuestionSource::Absent)
            .unwrap();
        assert_eq!(chats.len(), 1);

        let params = ChatParameters {
            answer_id: RowSelection::Id {
                name: "id".into(),
                value: "9".into(),
            },
            ..params
        };
        assert!(matches!(
            build_chats(&mut answers, &params, &template(), "", &QuestionSource::Absent),
            Err(BatchError::RowNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_answer_field() {
        let mut answers = table("id,text\n1,yes\n");
        assert!(matches!(
            build_chats(&mut answers, &params(), &template(), "", &QuestionSource::Absent),
            Err(BatchError::MissingAnswerField { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_requests_from_files_without_dispatch() {
        let dir = TempDir::new().unwrap();
        let path = |name: &str| dir.path().join(name).to_str().unwrap().to_string();
        std::fs::write(path("prompt.txt"), "Question: {{question}}\nAnswer: {{answer}}").unwrap();
        std::fs::write(path("answers.csv"), "qid,answer\nq1,yes\nq2,no\n").unwrap();
        std::fs::write(path("questions.csv"), "qid,question\nq1,Happy?\n").unwrap();

        let gateway = MockGateway::new();
        let params = ChatParameters {
            prompt_file: path("prompt.txt"),
            answer_file: path("answers.csv"),
            answer_field: "answer".into(),
            question_file: path("questions.csv"),
            question_field: "question".into(),
            question_id: "qid".into(),
            ..Default::default()
        };
        let err = build_requests(&gateway, &params, &mut TextCache::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::UnknownQuestions { ref ids, .. } if ids == &["q2"]));
        assert_eq!(gateway.chat_calls(), 0);

        std::fs::write(path("questions.csv"), "qid,question\nq1,Happy?\nq2,Sad?\n").unwrap();
        let (chats, answers) = build_requests(&gateway, &params, &mut TextCache::new())
            .await
            .unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[1].prompt(), "Question: Sad?\nAnswer: no");
        assert_eq!(answers.columns(), ["qid", "answer", "chatID"]);
        assert_eq!(gateway.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let gateway = MockGateway::new();
        let params = ChatParameters {
            model: "gpt-99".into(),
            ..params()
        };
        assert!(matches!(
            build_requests(&gateway, &params, &mut TextCache::new()).await,
            Err(BatchError::UnknownModel(_))
        ));
    }
}
