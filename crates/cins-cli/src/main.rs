use anyhow::Result;
use clap::{Parser, Subcommand};
use cins_upstream::{HttpCampaignSource, UpstreamConfig};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "cins-cli")]
#[command(about = "CINS command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the campaigns proxy API.
    Serve,
    /// One-shot: fetch, normalize, and print the envelope.
    Fetch,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cins_web::serve_from_env().await?,
        Commands::Fetch => {
            let config = UpstreamConfig::from_env();
            let source = HttpCampaignSource::new(&config)?;
            let envelope = cins_web::build_campaign_envelope(&source, Uuid::new_v4()).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }

    Ok(())
}
