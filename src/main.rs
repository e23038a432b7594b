//! CLI entry point for mdwiki-rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdwiki-rs")]
#[command(version)]
#[command(about = "A file-backed Markdown wiki server", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new wiki
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Serve the wiki
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "8010")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdwiki_rs=debug,tower_http=debug,info"
    } else {
        "mdwiki_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing wiki in {:?}", target_dir);
            mdwiki_rs::commands::init::init_site(&target_dir)?;
            println!("Initialized wiki in {:?}", target_dir);
        }

        Commands::Server { port, ip } => {
            // Refuse to serve without a valid config
            let wiki = mdwiki_rs::Wiki::new(&base_dir)
                .with_context(|| format!("Failed to load config in {:?}", base_dir))?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            mdwiki_rs::server::start(Arc::new(wiki), &ip, port).await?;
        }

        Commands::Version => {
            println!("mdwiki-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
