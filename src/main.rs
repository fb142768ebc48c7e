use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_quality_monitor::{
    config::Config,
    scheduler::Scheduler,
    store::{InputStore, SqliteInputStore},
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "video-quality-monitor")]
#[command(version = "0.1.0")]
#[command(about = "Live-video quality monitoring service for an IPTV/OTT headend")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address for the health-check surface
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port for the health-check surface
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Configuration store URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("video_quality_monitor={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Video Quality Monitor v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using configuration store: {}", config.database.url);

    let store = SqliteInputStore::connect(&config.database.url).await?;
    store.migrate().await?;
    info!("Configuration store connected and migrations applied");

    let store: Arc<dyn InputStore> = Arc::new(store);

    let scheduler = Scheduler::new(store.clone(), config.clone());
    tokio::spawn(async move {
        scheduler.run_forever().await;
    });
    info!(
        "Monitoring scheduler started: poll interval {}s, {} workers",
        config.scheduler.poll_interval_secs, config.scheduler.worker_count
    );

    let web_server = WebServer::new(&config, store)?;
    info!("Starting health-check server on {}:{}", web_server.host(), web_server.port());
    web_server.serve().await?;

    Ok(())
}
