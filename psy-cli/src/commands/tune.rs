//! `gpt tune`

use super::{print_json, print_raw};
use crate::cli::{TuneArgs, TuneCommand};
use anyhow::{Context, Result};
use psy_core::{format_elapsed, FineTuneEvent, FineTuneJob, FineTuneRequest};
use psy_openai::OpenAI;
use std::time::Duration;

pub async fn run(client: &OpenAI, args: TuneArgs) -> Result<()> {
    let raw = args.raw;
    match args.command {
        TuneCommand::Create {
            training_file,
            validation_file,
            base,
            suffix,
        } => {
            let request = FineTuneRequest {
                training_file,
                validation_file: validation_file.filter(|v| !v.is_empty()),
                model: base,
                suffix: suffix.filter(|s| !s.is_empty()),
                ..Default::default()
            };
            let context = || format!("create fine tune on {}", request.training_file);
            if raw {
                print_raw(&client.create_fine_tune_raw(&request).await.with_context(context)?);
            } else {
                let job = client.create_fine_tune(&request).await.with_context(context)?;
                println!("{}", describe(&job));
            }
        }
        TuneCommand::List { limit, after, full } => {
            let after = after.as_deref().filter(|a| !a.is_empty());
            if raw {
                let body = client
                    .list_fine_tunes_raw(limit, after)
                    .await
                    .context("list fine tunes")?;
                print_raw(&body);
                return Ok(());
            }
            let page = client
                .list_fine_tunes(limit, after)
                .await
                .context("list fine tunes")?;
            if full {
                print_json(&page.data)?;
            } else {
                for job in &page.data {
                    println!("{}", describe(job));
                }
            }
            if let (true, Some(last)) = (page.has_more, &page.last_id) {
                println!("more jobs: gpt tune list --after {last}");
            }
        }
        TuneCommand::Read { ids } => {
            for id in &ids {
                let context = || format!("read fine tune {id}");
                if raw {
                    print_raw(&client.read_fine_tune_raw(id).await.with_context(context)?);
                } else {
                    print_json(&client.read_fine_tune(id).await.with_context(context)?)?;
                }
            }
        }
        TuneCommand::Events { id, limit, full } => {
            let context = || format!("list events of fine tune {id}");
            if raw {
                let body = client
                    .list_fine_tune_events_raw(&id, limit)
                    .await
                    .with_context(context)?;
                print_raw(&body);
                return Ok(());
            }
            let page = client
                .list_fine_tune_events(&id, limit)
                .await
                .with_context(context)?;
            if full {
                print_json(&page.data)?;
            } else {
                // Newest first from the API; print in time order.
                for event in page.data.iter().rev() {
                    println!("{}", describe_event(event));
                }
            }
        }
        TuneCommand::Cancel { ids } => {
            for id in &ids {
                let context = || format!("cancel fine tune {id}");
                if raw {
                    print_raw(&client.cancel_fine_tune_raw(id).await.with_context(context)?);
                } else {
                    let job = client.cancel_fine_tune(id).await.with_context(context)?;
                    println!("{}", describe(&job));
                }
            }
        }
    }
    Ok(())
}

fn describe(job: &FineTuneJob) -> String {
    let mut line = format!("{} {} (base {})", job.name(), job.status, job.model);
    if let Some(finished) = job.finished_at.filter(|f| *f > job.created_at) {
        let secs = u64::try_from(finished - job.created_at).unwrap_or(0);
        line.push_str(&format!(", {} elapsed", format_elapsed(Duration::from_secs(secs))));
    }
    if job.trained_tokens > 0 {
        line.push_str(&format!(", {} tokens", job.trained_tokens));
    }
    if let Some(error) = job.error.as_ref().filter(|e| !e.message.is_empty()) {
        line.push_str(&format!(", error: {}", error.message));
    }
    line
}

fn describe_event(event: &FineTuneEvent) -> String {
    let time = timestamp(event.created_at);
    format!("{time} {} {}", event.level, event.message)
}

fn timestamp(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map_or_else(|| epoch_secs.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}
