use std::sync::Arc;

use clap::Parser;
use cloud::{LocalCache, SqlDocumentStore};
use migration::{Migrator, MigratorTrait};
use settings::{Database, Settings};

mod cli;
mod commands;
mod error;
mod settings;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli) -> error::Result<()> {
    let settings = Settings::load(&cli.global)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripmate={level},cloud={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = parse_database(&settings.remote.database()).await?;
    let remote = SqlDocumentStore::builder()
        .database(db)
        .poll_interval(settings.remote.poll_interval())
        .build()
        .await?;
    tracing::debug!(cache = %settings.cache.dir.display(), "settings loaded");

    let ctx = commands::Context {
        cache: LocalCache::new(&settings.cache.dir),
        remote: Arc::new(remote),
        trip: cli.global.trip.clone(),
        settings,
    };

    let session = commands::run(&ctx, cli.command).await?;
    if let Some(session) = session {
        session.flush().await;
    }
    Ok(())
}

async fn parse_database(config: &Database) -> error::Result<sea_orm::DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;

    Ok(database)
}
