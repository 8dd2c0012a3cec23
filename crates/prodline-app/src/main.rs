//! prodline - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Production line rate/status service with a live push feed
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PRODLINE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    prodline_telemetry::init_logging()?;

    info!("Starting prodline v{}", env!("CARGO_PKG_VERSION"));

    let config = prodline_app::AppConfig::load(args.config.as_deref())?;
    info!(
        port = config.dashboard.port,
        journal = ?config.store.journal_path,
        "Configuration loaded"
    );

    let app = prodline_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
