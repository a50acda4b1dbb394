#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod coordinator;
mod db;
mod discord;
mod parsers;
mod render;
mod surface;
mod utils;

use config::Config;
use surface::ChatSurface;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is a convenience for local runs; real environment variables win
    let _ = dotenvy::dotenv();
    utils::logging::init_tracing();

    let args = cli::Args::parse();
    let config = Arc::new(Config::load(args.config.as_deref())?);
    info!("eventbot starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let discord_client = Arc::new(discord::DiscordClient::new(config.clone()).await?);

    let renderer = render::MessageRenderer::from_file(
        db_manager.event_store(),
        &config.render.template_path,
    )?;
    let coordinator = Arc::new(coordinator::EventCoordinator::new(
        db_manager.clone(),
        discord_client.clone() as Arc<dyn ChatSurface>,
        renderer,
    ));
    discord_client.set_coordinator(coordinator).await;

    discord_client.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("eventbot shutting down");
    discord_client.stop().await?;
    Ok(())
}
