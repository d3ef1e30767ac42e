//! `gpt chat`: single prompts and templated runs over an answer table

use super::{print_json, print_raw};
use crate::cli::{ChatArgs, ChatCommand, Fields, RunFiles, Sampling, Scoring};
use anyhow::{bail, Context, Result};
use psy_batch::{
    build_requests, complete_chat, new_chat_id, poll_batch, process_batch_results, run_parallel,
    submit_batch, BatchResults, Chat, ChatParameters, RowSelection, RunEvent, Selection,
    Submission,
};
use psy_core::{format_elapsed, Gateway};
use psy_openai::OpenAI;
use psy_table::TextCache;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(client: OpenAI, args: ChatArgs) -> Result<()> {
    let sampling = args.sampling;
    match args.command {
        ChatCommand::Prompt {
            prompt_file,
            system_file,
            score_select,
            raw,
            json,
        } => {
            let mut cache = TextCache::new();
            let prompt = cache
                .read(&prompt_file)
                .with_context(|| format!("read prompt file {prompt_file}"))?
                .to_string();
            let system_file = system_file.unwrap_or_default();
            let system = cache
                .read(&system_file)
                .with_context(|| format!("read system file {system_file}"))?
                .to_string();
            let chat = Chat::new(
                new_chat_id(),
                &system,
                &prompt,
                &sampling.model,
                sampling.temperature,
                sampling.max_tokens,
            );
            send(&client, chat, score_select, raw, json).await
        }
        ChatCommand::Random {
            prompt_file,
            system_file,
            answer_file,
            question_file,
            fields,
            answer_id,
            score_select,
            raw,
            json,
        } => {
            let files = RunFiles {
                output_file: String::new(),
                prompt_file,
                system_file,
                answer_file,
                question_file,
            };
            let mut params = parameters(&sampling, files, fields, score_select);
            params.answer_id = RowSelection::parse(&answer_id)
                .with_context(|| format!("parse answer ID {answer_id}"))?;
            let (chats, _) = build_requests(&client, &params, &mut TextCache::new())
                .await
                .context("generate chat request")?;
            let Some(chat) = chats.into_iter().next() else {
                bail!(
                    "the selected answer in {} has a blank {} field",
                    params.answer_file,
                    params.answer_field
                );
            };
            send(&client, chat, score_select, raw, json).await
        }
        ChatCommand::Parallel {
            files,
            fields,
            scoring,
            batch_size,
        } => {
            let mut params = run_parameters(&sampling, files, fields, scoring);
            params.batch_size = batch_size;
            parallel(client, &params).await
        }
        ChatCommand::Batch {
            files,
            fields,
            scoring,
            wait,
            input_only,
        } => {
            let params = run_parameters(&sampling, files, fields, scoring);
            batch(&client, &params, wait, input_only).await
        }
        ChatCommand::Results { batch_id } => {
            report(&results(&client, &batch_id).await?);
            Ok(())
        }
    }
}

fn parameters(
    sampling: &Sampling,
    files: RunFiles,
    fields: Fields,
    score_select: Selection,
) -> ChatParameters {
    ChatParameters {
        output_file: files.output_file,
        prompt_file: files.prompt_file,
        system_file: files.system_file,
        answer_file: files.answer_file,
        question_file: files.question_file.unwrap_or_default(),
        answer_field: fields.answer_field,
        question_field: fields.question_field,
        question_id: fields.question_id,
        score_select,
        model: sampling.model.clone(),
        temperature: sampling.temperature,
        max_tokens: sampling.max_tokens,
        ..ChatParameters::default()
    }
}

fn run_parameters(
    sampling: &Sampling,
    files: RunFiles,
    fields: Fields,
    scoring: Scoring,
) -> ChatParameters {
    let mut params = parameters(sampling, files, fields, scoring.score_select);
    params.score_field = scoring.score_field;
    params
}

/// Complete one chat and print it.
async fn send(client: &OpenAI, chat: Chat, selection: Selection, raw: bool, json: bool) -> Result<()> {
    if raw {
        print_json(&chat.request)?;
        print_raw(
            &client
                .complete_chat_raw(&chat.request)
                .await
                .context("complete chat")?,
        );
        return Ok(());
    }
    let chat = complete_chat(client, chat, selection)
        .await
        .context("complete chat")?;
    if json {
        print_json(&chat)?;
    } else {
        print!("{chat}");
    }
    Ok(())
}

async fn parallel(client: OpenAI, params: &ChatParameters) -> Result<()> {
    let (chats, mut table) = build_requests(&client, params, &mut TextCache::new())
        .await
        .context("generate chat requests")?;
    let summary = run_parallel(Arc::new(client), chats, &mut table, params, |event| match event {
        RunEvent::Started {
            chats,
            batches,
            size,
        } => println!("Processing {chats} chats in {batches} batches of {size} each..."),
        RunEvent::Chat { count, chat } => match &chat.error {
            Some(error) => println!("{count}: {} {}ms {error}", chat.id, chat.millis),
            None => println!("{count}: {} {}ms", chat.id, chat.millis),
        },
        RunEvent::Progress(progress) => println!("{progress}"),
        RunEvent::Retrying(failed) => println!("retrying {failed} failed requests"),
    })
    .await
    .with_context(|| format!("save results file {}", params.output_file))?;
    println!("{summary}");
    println!("saved results file {}", params.output_file);
    Ok(())
}

async fn batch<G: Gateway + ?Sized>(
    gateway: &G,
    params: &ChatParameters,
    wait: u64,
    input_only: bool,
) -> Result<()> {
    let (chats, table) = build_requests(gateway, params, &mut TextCache::new())
        .await
        .context("generate chat requests")?;
    let submission = submit_batch(gateway, &chats, &table, params, input_only)
        .await
        .context("submit batch")?;
    match submission {
        Submission::InputOnly { path, requests } => {
            println!("saved batch input file {path} ({requests} requests)");
        }
        Submission::Submitted { file_id, batch } => {
            println!("uploaded batch input file {file_id}");
            println!("created batch {}: {}", batch.id, batch.status);
            println!(
                "saved incomplete results file (with chat IDs): {}",
                params.output_file
            );
            if wait == 0 {
                println!("Use the following command to monitor progress:");
                println!("gpt batch monitor {}", batch.id);
                println!("Once the batch is done, use the following command to process the results:");
                println!("gpt chat results {}", batch.id);
                return Ok(());
            }
            println!("polling for batch completion... (Ctrl+C to cancel)");
            poll_batch(gateway, &batch.id, Duration::from_secs(wait), |batch| {
                println!("{}", batch.progress());
            })
            .await
            .with_context(|| format!("poll batch {}", batch.id))?;
            report(&results(gateway, &batch.id).await?);
        }
    }
    Ok(())
}

/// Merge a finished batch's completions into its results file.
async fn results<G: Gateway + ?Sized>(gateway: &G, batch_id: &str) -> Result<BatchResults> {
    process_batch_results(gateway, batch_id)
        .await
        .with_context(|| format!("process batch {batch_id}"))
}

fn report(results: &BatchResults) {
    let counts = &results.batch.request_counts;
    println!(
        "completed {} chats ({} failed) in {}",
        counts.total,
        counts.failed,
        format_elapsed(results.batch.duration())
    );
    if results.summary.errors > 0 {
        println!("{} rows have errors", results.summary.errors);
    }
    println!("saved results file {}", results.output_file);
}

#[cfg(test)]
mod tests {
    use super::{batch, results};
    use pretty_assertions::assert_eq;
    use psy_batch::testing::MockGateway;
    use psy_batch::ChatParameters;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn params(dir: &Path) -> ChatParameters {
        ChatParameters {
            prompt_file: write(dir, "prompt.txt", "Answer: {{answer}}\nRating:"),
            answer_file: write(dir, "answers.csv", "student,answer\nann,Paris\n"),
            answer_field: "answer".into(),
            output_file: dir.join("scores.csv").to_str().unwrap().to_string(),
            ..Default::default()
        }
    }

    fn messages(error: &anyhow::Error) -> Vec<String> {
        error.chain().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_batch_names_the_generate_step() {
        let dir = TempDir::new().unwrap();
        let params = ChatParameters {
            prompt_file: dir.path().join("missing.txt").to_str().unwrap().to_string(),
            ..params(dir.path())
        };
        let error = batch(&MockGateway::new(), &params, 0, false).await.unwrap_err();
        assert_eq!(messages(&error)[0], "generate chat requests");
        assert!(messages(&error)[1].contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_batch_names_the_submit_step() {
        let dir = TempDir::new().unwrap();
        let params = ChatParameters {
            output_file: dir.path().join("absent").join("scores.csv").to_str().unwrap().to_string(),
            ..params(dir.path())
        };
        let gateway = MockGateway::new();
        let error = batch(&gateway, &params, 0, false).await.unwrap_err();
        assert_eq!(messages(&error)[0], "submit batch");
        assert!(gateway.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_results_names_the_batch() {
        let error = results(&MockGateway::new(), "batch_42").await.unwrap_err();
        assert_eq!(messages(&error)[0], "process batch batch_42");
        assert!(messages(&error)[1].contains("batch_42"));
    }
}
