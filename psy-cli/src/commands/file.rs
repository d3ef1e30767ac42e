//! `gpt file`

use super::{print_json, print_raw};
use crate::cli::{FileArgs, FileCommand};
use anyhow::{Context, Result};
use psy_core::{FileHandle, Gateway};
use psy_openai::OpenAI;
use std::path::{Path, PathBuf};

pub async fn run(client: &OpenAI, args: FileArgs) -> Result<()> {
    let raw = args.raw;
    match args.command {
        FileCommand::List { purpose, full } => {
            let purpose = purpose.as_deref().filter(|p| !p.is_empty());
            if raw {
                print_raw(&client.list_files_raw(purpose).await.context("list files")?);
                return Ok(());
            }
            let files = client.list_files(purpose).await.context("list files")?;
            if full {
                print_json(&files)?;
            } else {
                for file in &files {
                    println!("{}", describe(file));
                }
            }
        }
        FileCommand::Read { ids } => {
            for id in &ids {
                let context = || format!("read file {id}");
                if raw {
                    print_raw(&client.read_file_raw(id).await.with_context(context)?);
                } else {
                    print_json(&client.read_file(id).await.with_context(context)?)?;
                }
            }
        }
        FileCommand::Upload { path, purpose } => upload(client, &path, &purpose, raw).await?,
        FileCommand::Download { id, output } => download(client, &id, output).await?,
        FileCommand::Delete { ids } => {
            for id in &ids {
                let context = || format!("delete file {id}");
                if raw {
                    print_raw(&client.delete_file_raw(id).await.with_context(context)?);
                } else {
                    let deleted = client.delete_file(id).await.with_context(context)?;
                    println!("deleted file {}: {}", deleted.id, deleted.deleted);
                }
            }
        }
    }
    Ok(())
}

fn describe(file: &FileHandle) -> String {
    format!(
        "{} {} ({}, {} bytes)",
        file.id, file.filename, file.purpose, file.bytes
    )
}

async fn upload(client: &OpenAI, path: &Path, purpose: &str, raw: bool) -> Result<()> {
    let content =
        std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let context = || format!("upload file {}", path.display());
    if raw {
        print_raw(&client.upload_file_raw(&name, purpose, content).await.with_context(context)?);
    } else {
        let file = client.upload_file(&name, purpose, content).await.with_context(context)?;
        println!("uploaded {}", describe(&file));
    }
    Ok(())
}

async fn download(client: &OpenAI, id: &str, output: Option<PathBuf>) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => {
            let name = client
                .read_file(id)
                .await
                .with_context(|| format!("read file {id}"))?
                .filename;
            PathBuf::from(if name.is_empty() { id.to_string() } else { name })
        }
    };
    let content = client
        .download_file(id)
        .await
        .with_context(|| format!("download file {id}"))?;
    std::fs::write(&output, &content)
        .with_context(|| format!("write {}", output.display()))?;
    println!("downloaded {id} to {} ({} bytes)", output.display(), content.len());
    Ok(())
}
