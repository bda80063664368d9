use anyhow::Context;
use clap::Parser;
use hn_scrapers::{
    handle_command, init_logging, Extraction, HackerNewsScraper, IngestPipeline, Selectors,
};
use hn_storage::Storage;
use hn_web::{Accounts, AppState, Passwords, TokenAuthority};
use std::sync::Arc;
use tracing::{info, warn};

mod config;

use config::{Cli, Commands};

fn token_authority(cli: &Cli) -> TokenAuthority {
    if cli.uses_dev_secret() {
        warn!("⚠️ SECRET_KEY is not set, tokens are signed with the development secret");
    }
    TokenAuthority::new(
        cli.jwt_secret.as_bytes(),
        chrono::Duration::days(cli.token_expire_days),
    )
}

async fn open_storage(cli: &Cli) -> anyhow::Result<Storage> {
    hn_storage::create_storage(cli.storage, &cli.database_url)
        .await
        .with_context(|| format!("Failed to open {} storage", cli.storage))
}

fn build_pipeline(cli: &Cli, storage: &Storage) -> anyhow::Result<IngestPipeline> {
    let scraper = HackerNewsScraper::with_config(
        &cli.start_url,
        cli.fetch_config(),
        &Selectors::default(),
        Extraction::default(),
    )
    .context("Failed to set up the scraper")?;
    info!("🦗 Scraper ready (starting at {})", cli.start_url);

    Ok(IngestPipeline::new(storage.articles.clone(), Arc::new(scraper)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match &cli.command {
        Commands::Token { user_id } => {
            let token = token_authority(&cli).issue(*user_id)?;
            println!("{}", token);
        }
        Commands::Scrape(args) => {
            let storage = open_storage(&cli).await?;
            let pipeline = build_pipeline(&cli, &storage)?;
            handle_command(args.clone(), &pipeline).await?;
        }
        Commands::Serve { bind } => {
            let storage = open_storage(&cli).await?;
            let state = AppState {
                pipeline: Arc::new(build_pipeline(&cli, &storage)?),
                accounts: Arc::new(Accounts::new(storage.users, Passwords::new())),
                tokens: Arc::new(token_authority(&cli)),
            };
            hn_web::serve(state, *bind).await?;
            info!("👋 Server stopped");
        }
    }

    Ok(())
}
