use anyhow::Result;
use chatrelay_config::AppConfig;
use chatrelay_engine::Engine;
use chatrelay_gateway::GatewayServer;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatrelay", version, about = "Multi-provider AI chat relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Bind address override
        #[arg(long)]
        host: Option<String>,
        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print which providers and real-time categories are configured
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; the environment may be set directly.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            GatewayServer::new(config).run().await?;
        }
        Command::Check => {
            let engine = Engine::new(&config);

            println!("providers:");
            for provider in engine.configured_providers() {
                println!("  {provider}");
            }

            println!("real-time categories:");
            for status in engine.facts().capabilities() {
                let state = if status.configured {
                    "configured"
                } else {
                    "missing credential"
                };
                println!("  {}: {state}", status.category);
            }
        }
    }

    Ok(())
}
