mod analysis;
mod cli;
mod commands;
mod config;
mod error;
mod ocr;
mod page_range;
mod pdf;
mod server;
mod spelling;
mod workspace;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdftools=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let mut config = Config::from_env();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(config).await?;
        }
        Commands::Pages { expression, total } => {
            commands::pages::run(&expression, total)?;
        }
        Commands::Split {
            path,
            pages,
            output,
        } => {
            commands::split::run(&path, &pages, &output)?;
        }
        Commands::Merge { inputs, output } => {
            commands::merge::run(&inputs, &output)?;
        }
        Commands::Rotate {
            path,
            angle,
            pages,
            output,
        } => {
            commands::rotate::run(&path, angle, &pages, &output)?;
        }
        Commands::Compress {
            path,
            quality,
            output,
        } => {
            commands::compress::run(&path, &quality, &output)?;
        }
        Commands::Search { keyword, path } => {
            commands::search::run(&path, &keyword)?;
        }
        Commands::Analyze { path } => {
            commands::analyze::run(&path)?;
        }
    }

    Ok(())
}
