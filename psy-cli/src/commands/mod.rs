//! Command implementations behind the `gpt` subcommands.

mod batch;
mod chat;
mod file;
mod model;
mod tune;

use crate::cli::{Cli, Command};
use anyhow::{Context, Result};
use psy_openai::{OpenAI, OpenAIConfig};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Run the parsed command line.
pub async fn dispatch(cli: Cli) -> Result<()> {
    if matches!(cli.command, Command::About) {
        about(&cli);
        return Ok(());
    }
    let client = client(&cli)?;
    match cli.command {
        Command::About => Ok(()),
        Command::Model(args) => model::run(&client, args).await,
        Command::File(args) => file::run(&client, args).await,
        Command::Batch(args) => batch::run(&client, args).await,
        Command::Tune(args) => tune::run(&client, args).await,
        Command::Chat(args) => chat::run(client, args).await,
    }
}

/// Build the API client from the key, organization and base URL options.
fn client(cli: &Cli) -> Result<OpenAI> {
    let api_key = cli
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .context("OPENAI_API_KEY is not set; export it, add it to .env, or pass --api-key")?;
    let mut config =
        OpenAIConfig::new(api_key).with_timeout(Duration::from_secs(cli.timeout.max(1)));
    if let Some(org) = cli.org_id.as_deref().filter(|o| !o.is_empty()) {
        config = config.with_organization(org);
    }
    if let Some(url) = cli.base_url.as_deref().filter(|u| !u.is_empty()) {
        config = config.with_base_url(url);
    }
    debug!(base_url = %config.base_url, timeout = ?config.timeout, "client configured");
    OpenAI::new(config).context("create OpenAI client")
}

fn about(cli: &Cli) {
    println!("gpt: OpenAI GPT Command Line Tool");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Organization ID: {}",
        cli.org_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "API Key: {}",
        cli.api_key.as_deref().map_or_else(|| "(not set)".to_string(), mask)
    );
}

/// Show only the ends of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Print a response body exactly as the API returned it.
fn print_raw(body: &[u8]) {
    println!("{}", String::from_utf8_lossy(body).trim_end());
}

/// Print a value as indented JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
