//! `gpt model`

use super::{print_json, print_raw};
use crate::cli::{ModelArgs, ModelCommand};
use anyhow::{Context, Result};
use psy_openai::OpenAI;

pub async fn run(client: &OpenAI, args: ModelArgs) -> Result<()> {
    let raw = args.raw;
    match args.command {
        ModelCommand::List { full } => {
            if raw {
                print_raw(&client.list_models_raw().await.context("list models")?);
                return Ok(());
            }
            let mut models = client.list_models().await.context("list models")?;
            models.sort_by(|a, b| a.id.cmp(&b.id));
            if full {
                print_json(&models)?;
            } else {
                for model in &models {
                    println!("{} ({})", model.id, model.owned_by);
                }
            }
        }
        ModelCommand::Read { ids } => {
            for id in &ids {
                let context = || format!("read model {id}");
                if raw {
                    print_raw(&client.read_model_raw(id).await.with_context(context)?);
                } else {
                    print_json(&client.read_model(id).await.with_context(context)?)?;
                }
            }
        }
        ModelCommand::Delete { ids } => {
            for id in &ids {
                let context = || format!("delete model {id}");
                if raw {
                    print_raw(&client.delete_model_raw(id).await.with_context(context)?);
                } else {
                    let deleted = client.delete_model(id).await.with_context(context)?;
                    println!("deleted model {}: {}", deleted.id, deleted.deleted);
                }
            }
        }
    }
    Ok(())
}
