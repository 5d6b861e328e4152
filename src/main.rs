use anyhow::{anyhow, Context};
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use reelsync::config::Settings;
use reelsync::douban::DoubanClient;
use reelsync::notion::{NotionClient, Workspace};
use reelsync::retry::RetryPolicy;
use reelsync::sync;

/// Sync a Douban movie-watching history into a Notion workspace.
#[derive(Debug, Parser)]
#[command(name = "reelsync", version, about)]
struct Cli {
    /// Douban user id; overrides the DOUBAN_NAME environment variable.
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("loading settings")?;
    let user = cli
        .user
        .or_else(|| settings.douban_user.clone())
        .ok_or_else(|| anyhow!("set DOUBAN_NAME or pass --user"))?;

    let retry = RetryPolicy::default();
    let notion = NotionClient::new(settings.notion_token.clone(), retry);
    let mut workspace = Workspace::connect(notion, &settings.notion_root_url, &settings.database_names)
        .await
        .context("connecting to the Notion workspace")?;

    let douban = DoubanClient::new(&settings, retry);
    let stats = sync::run(&mut workspace, &douban, &user)
        .await
        .context("reconciling watching history")?;

    tracing::info!(
        "Sync finished: {} created, {} updated, {} skipped, {} malformed",
        stats.created,
        stats.updated,
        stats.skipped,
        stats.malformed
    );
    Ok(())
}
