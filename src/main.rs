use anyhow::Result;
use daily_organizer::config::Config;
use daily_organizer::{app, logger};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logger::setup_logger(&config.logging)?;

    app::run_app(config).await
}
