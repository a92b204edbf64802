//! Dashboard CLI
//!
//! Command-line client for the dataset dashboard backend. Every dataset
//! command runs through the authenticated request pipeline, so an expired
//! access credential is renewed once and the request replayed without the
//! user noticing. When renewal is impossible the session is cleared and the
//! CLI asks for a fresh login.

mod api;
mod cli;
mod config;
mod error;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use common::Secret;
use dashboard_auth::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use dispatch::ReqwestDispatcher;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::DashboardApi;
use crate::cli::{Args, Command, USAGE};
use crate::config::Config;

/// Exit code for "log in again".
const EXIT_LOGIN_REQUIRED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // JSON logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let login_required = e
                .downcast_ref::<error::Error>()
                .is_some_and(error::Error::requires_login);
            if login_required {
                warn!(error = %e, "session unusable");
                eprintln!("session expired, please log in again");
                ExitCode::from(EXIT_LOGIN_REQUIRED)
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        in_memory = config.auth.in_memory,
        "configuration loaded"
    );

    let store: Arc<dyn CredentialStore> = if config.auth.in_memory {
        Arc::new(MemoryCredentialStore::new())
    } else {
        let path = &config.auth.credentials_file;
        let store = FileCredentialStore::load(path.clone())
            .await
            .with_context(|| format!("failed to load credentials from {}", path.display()))?;
        info!(path = %store.path().display(), "using credential file");
        Arc::new(store)
    };

    let dispatcher = ReqwestDispatcher::new(
        reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?,
    )
    .with_timeout(config.timeout());

    let api = DashboardApi::new(
        config.api.base_url.clone(),
        store,
        Arc::new(dispatcher),
        config.refresh_timeout(),
    );

    match args.command {
        Command::Login { username } => {
            let username = username
                .or_else(|| config.auth.username.clone())
                .ok_or_else(|| error::Error::MissingInput("username".into()))?;
            api.login(&username, password(&config)?).await?;
            println!("logged in as {username}");
        }
        Command::Signup { username, email } => {
            api.signup(&username, &email, password(&config)?).await?;
            println!("account {username} created");
        }
        Command::Logout => {
            api.logout().await?;
            println!("logged out");
        }
        Command::Upload { file } => print_json(&api.upload_csv(&file).await?)?,
        Command::Datasets => print_json(&api.list_datasets().await?)?,
        Command::Summary { dataset_id } => print_json(&api.summary(&dataset_id).await?)?,
        Command::Table {
            dataset_id,
            page,
            page_size,
        } => print_json(&api.table(&dataset_id, page, page_size).await?)?,
        Command::Report { dataset_id, dest } => {
            let bytes = api.download_report(&dataset_id, &dest).await?;
            report_saved(&dest, bytes);
        }
        Command::CleanCsv { dataset_id, dest } => {
            let bytes = api.download_clean_csv(&dataset_id, &dest).await?;
            report_saved(&dest, bytes);
        }
    }

    Ok(())
}

fn password(config: &Config) -> error::Result<&Secret<String>> {
    config.auth.password.as_ref().ok_or_else(|| {
        error::Error::MissingInput("password: set DASHBOARD_PASSWORD or auth.password_file".into())
    })
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_saved(dest: &Path, bytes: usize) {
    println!("saved {bytes} bytes to {}", dest.display());
}
