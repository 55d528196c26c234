//! mentorlink-server binary

use std::path::PathBuf;

use clap::Parser;
use mentorlink_core::ServiceConfig;
use mentorlink_server::{metrics, ServerBuilder};

#[derive(Parser, Debug)]
#[command(name = "mentorlink-server")]
#[command(about = "Student/mentor matchmaking service")]
struct Args {
    /// Path to a JSON service configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, default_value = "4000")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };

    let secret = match std::env::var("MENTORLINK_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            tracing::warn!("MENTORLINK_SECRET not set, using an insecure development secret");
            "mentorlink-dev-secret".to_string()
        }
    };

    let handle = metrics::init_prometheus_recorder();

    let server = ServerBuilder::new(config)
        .port(args.port)
        .secret(secret)
        .metrics_handle(handle)
        .build()
        .await?;

    tracing::info!("Server ready on port {}", args.port);
    server.run().await?;

    Ok(())
}
