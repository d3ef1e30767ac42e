//! `gpt batch`

use super::{print_json, print_raw};
use crate::cli::{BatchArgs, BatchCommand};
use anyhow::{bail, Context, Result};
use psy_batch::{keys, poll_batch};
use psy_core::{Batch, CreateBatchRequest, Gateway, Page, BATCH_PURPOSE};
use psy_openai::OpenAI;
use std::collections::BTreeMap;
use std::time::Duration;

pub async fn run(client: &OpenAI, args: BatchArgs) -> Result<()> {
    let raw = args.raw;
    match args.command {
        BatchCommand::Create { input_file_id } => create(client, &input_file_id, raw).await?,
        BatchCommand::Read { ids } => {
            for id in &ids {
                let context = || format!("read batch {id}");
                if raw {
                    print_raw(&client.read_batch_raw(id).await.with_context(context)?);
                } else {
                    print_json(&client.read_batch(id).await.with_context(context)?)?;
                }
            }
        }
        BatchCommand::Monitor { id, wait } => {
            let batch = poll_batch(client, &id, Duration::from_secs(wait.max(1)), |batch| {
                println!("{}", batch.progress());
            })
            .await
            .with_context(|| format!("monitor batch {id}"))?;
            if raw {
                print_json(&batch)?;
            }
        }
        BatchCommand::Cancel { ids } => {
            for id in &ids {
                let context = || format!("cancel batch {id}");
                if raw {
                    print_raw(&client.cancel_batch_raw(id).await.with_context(context)?);
                } else {
                    let batch = client.cancel_batch(id).await.with_context(context)?;
                    println!("{}", batch.progress());
                }
            }
        }
        BatchCommand::List { limit, after, full } => {
            let after = after.as_deref().filter(|a| !a.is_empty());
            if raw {
                let body = client
                    .list_batches_raw(limit, after)
                    .await
                    .context("list batches")?;
                print_raw(&body);
                return Ok(());
            }
            let page = client
                .list_batches(limit, after)
                .await
                .context("list batches")?;
            if full {
                print_json(&page.data)?;
            } else {
                for batch in &page.data {
                    println!("{}", batch.progress());
                }
            }
            print_cursor(&page);
        }
    }
    Ok(())
}

/// Create a chat-completions batch over an already uploaded input file.
async fn create(client: &OpenAI, input_file_id: &str, raw: bool) -> Result<()> {
    let file = client
        .read_file(input_file_id)
        .await
        .with_context(|| format!("read batch input file {input_file_id}"))?;
    if file.purpose != BATCH_PURPOSE {
        bail!(
            "file {} has purpose {:?}; batch input files need purpose {BATCH_PURPOSE:?}",
            file.id,
            file.purpose
        );
    }
    let metadata = BTreeMap::from([(keys::INPUT_FILE.to_string(), file.filename.clone())]);
    let request = CreateBatchRequest::chat(file.id, metadata);
    let context = || format!("create batch for input file {input_file_id}");
    if raw {
        print_json(&request)?;
        print_raw(&client.create_batch_raw(&request).await.with_context(context)?);
    } else {
        let batch = client.create_batch(&request).await.with_context(context)?;
        println!("created batch {}: {}", batch.id, batch.status);
    }
    Ok(())
}

fn print_cursor(page: &Page<Batch>) {
    if page.has_more {
        if let Some(last) = &page.last_id {
            println!("more batches: gpt batch list --after {last}");
        }
    }
}
