//! authprobe - exercise a token-based HTTP authentication service.
//!
//! Each subcommand performs one request (or the scripted admin workflow)
//! and prints the server's JSON envelope to stdout. Logs go to stderr.

mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authprobe_core::{ApiClient, Config, Envelope, Scenario};
use cli::{Cli, Command, SessionArgs};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?.with_overrides(Config::env_base_url(), cli.url, cli.timeout);
    debug!(base_url = config.base_url(), timeout = ?config.timeout(), "Loaded configuration");

    match cli.command {
        Command::Login { user, secret, scopes } => {
            let secret = secret_or_prompt(secret, &user)?;
            let mut client = ApiClient::from_config(&config)?;
            let response = client.login(&user, &secret, &scopes).await?;
            print_envelope(&response)?;
        }
        Command::Check { session } => {
            let client = open_session(&config, session).await?;
            print_envelope(&client.check().await?)?;
        }
        Command::CreateScope { session, scope, raw } => {
            let payload = scope_payload(scope, raw)?;
            let client = open_session(&config, session).await?;
            print_envelope(&client.create_scope(&payload).await?)?;
        }
        Command::CreateUser { session, name, secret, life, scopes } => {
            let secret = secret_or_prompt(secret, &name)?;
            let client = open_session(&config, session).await?;
            print_envelope(&client.create_user(&name, &secret, life, &scopes).await?)?;
        }
        Command::Clean { session } => {
            let client = open_session(&config, session).await?;
            print_envelope(&client.clean().await?)?;
        }
        Command::Health => {
            let client = ApiClient::from_config(&config)?;
            print!("{}", client.health().await?);
        }
        Command::Scenario(args) => run_scenario(&config, Scenario::from(args)).await?,
    }

    Ok(())
}

/// Scope payload for `create-scope`: a JSON string, or SCOPE parsed as JSON
/// with `--raw`
fn scope_payload(scope: String, raw: bool) -> Result<Value> {
    if raw {
        serde_json::from_str(&scope).context("--raw scope is not valid JSON")
    } else {
        Ok(Value::String(scope))
    }
}

/// Build a session for an authenticated command. A refused login is printed
/// and the command still runs, unauthenticated, so the server's answer is
/// visible.
async fn open_session(config: &Config, args: SessionArgs) -> Result<ApiClient> {
    let (client, refused) = prepare_session(config, args).await?;
    if let Some(response) = refused {
        eprintln!("Login refused: {}", serde_json::to_string(&response)?);
    }
    Ok(client)
}

/// Install the given token or log in first. Returns the login response
/// when the server refused it.
async fn prepare_session(
    config: &Config,
    args: SessionArgs,
) -> Result<(ApiClient, Option<Envelope>)> {
    let mut client = ApiClient::from_config(config)?;

    if let Some(token) = args.token {
        client.set_token(token)?;
    } else if let Some(user) = args.login_user {
        let secret = secret_or_prompt(args.login_secret, &user)?;
        let response = client.login(&user, &secret, &args.login_scopes).await?;
        if !response.is_ok() {
            return Ok((client, Some(response)));
        }
    }

    Ok((client, None))
}

async fn run_scenario(config: &Config, scenario: Scenario) -> Result<()> {
    info!(steps = ?scenario.steps(), "Running scenario");
    for outcome in scenario.run(config).await? {
        println!("# {}", outcome.step);
        print_envelope(&outcome.response)?;
    }
    Ok(())
}

fn secret_or_prompt(secret: Option<String>, user: &str) -> Result<String> {
    match secret {
        Some(secret) => Ok(secret),
        None => rpassword::prompt_password(format!("Secret for {}: ", user))
            .context("Failed to read secret"),
    }
}

fn print_envelope(envelope: &Envelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}
