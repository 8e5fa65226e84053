//! uaflow CLI - Command-line interface for uaflow
//!
//! Hosts the server and browser nodes on stdin/stdout and offers one-shot
//! browsing of a running endpoint.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "uaflow")]
#[command(author = "uaflow Contributors")]
#[command(version)]
#[command(about = "A live address-space server and browser for message flows", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./.uaflow/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration into a directory
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run the server node, reading flow messages from stdin
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Product name reported in the build info
        #[arg(short, long)]
        name: Option<String>,

        /// JSON model seed to load before the vendor model
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Headless mode: bind to 0.0.0.0 for remote access
        #[arg(long)]
        headless: bool,
    },

    /// Browse one node of a running endpoint and print its references
    Browse {
        /// Node to browse (defaults to the Objects folder)
        root: Option<String>,

        /// Endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Run the browser node, reading flow messages from stdin
    Browser {
        /// Endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Persisted browse root
        #[arg(short, long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries flow messages.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Serve {
            port,
            name,
            seed,
            headless,
        } => commands::serve(config, port, name, seed, headless).await,
        Commands::Browse {
            root,
            endpoint,
            json,
        } => commands::browse(config, root.as_deref(), endpoint, json).await,
        Commands::Browser { endpoint, topic } => commands::browser(config, endpoint, topic).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
