//! End-to-end runs of the completion pipeline against an in-memory gateway

use pretty_assertions::assert_eq;
use psy::batch::testing::MockGateway;
use psy::batch::{
    build_requests, run_parallel, BatchError, ChatParameters, RowSelection, RunEvent, Selection,
};
use psy::table::{Table, TextCache};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

struct Fixture {
    dir: TempDir,
    params: ChatParameters,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let params = ChatParameters {
        system_file: write(dir.path(), "system.txt", "Reply with a rating from 1 to 5."),
        prompt_file: write(
            dir.path(),
            "prompt.txt",
            "Question: {{question}}\nAnswer: {{answer}}\nRating:",
        ),
        answer_file: write(
            dir.path(),
            "answers.csv",
            "student,qid,answer\nann,q1,Paris\nbob,q1,  \ncal,q2,Four\ndee,q2,Five\n",
        ),
        answer_field: "answer".into(),
        question_file: write(
            dir.path(),
            "questions.csv",
            "qid,question\nq1,Capital of France?\nq2,Two plus two?\n",
        ),
        question_field: "question".into(),
        question_id: "qid".into(),
        output_file: dir.path().join("scores.csv").to_str().unwrap().to_string(),
        ..Default::default()
    };
    Fixture { dir, params }
}

#[tokio::test]
async fn test_parallel_run_skips_blank_answers() {
    let Fixture { dir: _dir, params } = fixture();
    let gateway = Arc::new(MockGateway::new().with_reply(|request| {
        if request.messages[1].content.contains("Paris") {
            "5".to_string()
        } else {
            "I'd say 2, maybe 3".to_string()
        }
    }));

    let (chats, mut table) = build_requests(gateway.as_ref(), &params, &mut TextCache::new())
        .await
        .unwrap();
    assert_eq!(chats.len(), 3);
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.rows()[1].get("chatID"), "");
    assert_eq!(
        chats[0].prompt(),
        "Question: Capital of France?\nAnswer: Paris\nRating:"
    );

    let mut progress = Vec::new();
    let summary = run_parallel(gateway.clone(), chats, &mut table, &params, |event| {
        if let RunEvent::Progress(p) = event {
            progress.push(p.to_string());
        }
    })
    .await
    .unwrap();

    assert_eq!(summary.chats, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(progress.len(), 1);
    assert!(progress[0].starts_with("batch 1 of 1: 3 chats in "));
    assert_eq!(gateway.chat_calls(), 3);

    let written = Table::load(&params.output_file).unwrap();
    assert_eq!(
        written.columns(),
        ["student", "qid", "answer", "chatID", "completion", "score"]
    );
    let rows = written.rows();
    assert_eq!(rows[0].get("score"), "5.000000");
    assert_eq!(rows[1].get("completion"), "");
    assert_eq!(rows[2].get("score"), "3.000000");
}

#[tokio::test]
async fn test_unresolved_question_sends_nothing() {
    let Fixture { dir, mut params } = fixture();
    params.question_file = write(dir.path(), "questions.csv", "qid,question\nq1,Capital?\n");
    let gateway = MockGateway::new();

    let err = build_requests(&gateway, &params, &mut TextCache::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("unknown question IDs in answer file {}: q2, q2", params.answer_file)
    );
    assert_eq!(gateway.chat_calls(), 0);
    assert!(!Path::new(&params.output_file).exists());
}

#[tokio::test]
async fn test_single_row_with_fixed_question() {
    let Fixture { dir: _dir, mut params } = fixture();
    params.question_id = "qid=q2".into();
    params.answer_id = RowSelection::parse("student=dee").unwrap();
    params.score_select = Selection::All;
    let gateway = MockGateway::new();

    let (chats, table) = build_requests(&gateway, &params, &mut TextCache::new())
        .await
        .unwrap();

    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].prompt(), "Question: Two plus two?\nAnswer: Five\nRating:");
    assert_eq!(chats[0].request.messages[0].content, "Reply with a rating from 1 to 5.");
    assert_eq!(table.rows()[3].get("chatID"), chats[0].id);
    assert_eq!(table.rows()[0].get("chatID"), "");

    params.answer_id = RowSelection::parse("student=zed").unwrap();
    assert!(matches!(
        build_requests(&gateway, &params, &mut TextCache::new()).await,
        Err(BatchError::RowNotFound { .. })
    ));
}

#[test]
fn test_random_row_selection() {
    let Fixture { dir: _dir, mut params } = fixture();
    params.answer_id = RowSelection::Random;
    params.question_file = String::new();
    let gateway = MockGateway::new();

    let (chats, _) =
        tokio_test::block_on(build_requests(&gateway, &params, &mut TextCache::new())).unwrap();

    // Bob's blank answer may be the one drawn
    assert!(chats.len() <= 1);
}
