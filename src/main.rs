//! # Roamcast — scheduled travel-post generator for Telegram
//!
//! Generates text + image posts via an OpenAI-compatible provider and
//! publishes them to a Telegram group on an admin-configured cadence, either
//! directly or through an automation relay.
//!
//! Usage:
//!   roamcast                  # Start the gateway server
//!   roamcast serve --port 9000
//!   roamcast generate         # One-shot post generation to stdout
//!   roamcast config           # Print the resolved configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roamcast", version, about = "🌍 Roamcast — scheduled travel posts for Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate one post and print it, without publishing or scheduling
    Generate,
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "roamcast=debug,tower_http=debug"
    } else {
        "roamcast=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = roamcast_core::RoamcastConfig::load()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            roamcast_gateway::start(config).await
        }
        Commands::Generate => {
            let client = roamcast_providers::OpenAiClient::new(&config.api_key, &config.api_base_url);
            let generator = roamcast_providers::PostGenerator::new(client, config.llm.clone());
            let post = generator.generate(None).await?;
            println!("{}", serde_json::to_string_pretty(&post)?);
            Ok(())
        }
        Commands::Config => {
            let mut sanitized = config.clone();
            if !sanitized.api_key.is_empty() {
                sanitized.api_key = "••••".into();
            }
            if !sanitized.telegram.bot_token.is_empty() {
                sanitized.telegram.bot_token = "••••".into();
            }
            println!("{}", toml::to_string_pretty(&sanitized)?);
            Ok(())
        }
    }
}
