use std::path::PathBuf;

use anyhow::Context;
use axum::extract::FromRef;
use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod clock;
mod commands;
mod config;
mod controllers;
mod models;
mod pages;
mod storage;

mod error;
pub(crate) use error::{ApiError, ApiResult};

pub(crate) mod types;

use clock::{SystemClock, TimeSource};
use config::{Config, StorageKind};
use storage::AnyStore;

/// Shared state handed to every command and request handler.
#[derive(Clone, FromRef)]
pub struct App {
    config: Config,
    store: AnyStore,
    time: TimeSource,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = AnyStore::open(&config.storage)
            .await
            .context("failed to open storage")?;
        let time = TimeSource::new(SystemClock, config.test_mode);

        Ok(Self {
            config,
            store,
            time,
        })
    }
}

/// A small paste service with expiring and view-limited pastes.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,

    #[arg(long, env = "BASE_URL", global = true)]
    base_url: Option<String>,

    /// Honor the x-test-now-ms request header.
    #[arg(
        long,
        env = "TEST_MODE",
        global = true,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = FalseyValueParser::new(),
    )]
    test_mode: Option<bool>,

    /// Use SQL storage at this URL.
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Use Redis storage at this URL.
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,
    /// Print a stored paste without counting a view.
    Inspect { id: String },
}

impl Cli {
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(test_mode) = self.test_mode {
            config.test_mode = test_mode;
        }
        if let Some(url) = &self.database_url {
            config.storage.kind = StorageKind::Sql;
            config.storage.sql.url = url.clone();
        }
        if let Some(url) = &self.redis_url {
            #[cfg(feature = "redis")]
            {
                config.storage.kind = StorageKind::Redis;
                config.storage.redis.url = url.clone();
            }
            #[cfg(not(feature = "redis"))]
            tracing::warn!(%url, "ignoring redis url, built without the `redis` feature");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config)?;

    let app = App::new(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => commands::serve::run(app).await,
        Command::Inspect { id } => commands::inspect::run(app, &id).await,
    }
}
