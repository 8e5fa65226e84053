//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uaflow_client::{BrowseSession, WsProtocolClient, DEFAULT_ROOT};
use uaflow_core::NodeId;
use uaflow_flow::{run_stdio, BrowserNode, FlowConfig, ServerNode};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Write a default configuration.
pub fn init(path: &Path) -> Result<()> {
    match FlowConfig::write_default(path)? {
        Some(config_path) => {
            println!("{} Wrote {}", "✓".green(), config_path.display());
            println!("  Run {} to start the server node", "uaflow serve".cyan());
        }
        None => println!("{} Already initialized", "✓".green()),
    }
    Ok(())
}

/// Run the server node on stdin/stdout.
pub async fn serve(
    config: Option<&Path>,
    port: Option<u16>,
    name: Option<String>,
    seed: Option<PathBuf>,
    headless: bool,
) -> Result<()> {
    let mut config = FlowConfig::load(config)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(name) = name {
        config.server.name = name;
    }
    if seed.is_some() {
        config.server.seed = seed;
    }
    if headless {
        config.server.bind = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    }

    eprintln!(
        "{} Serving on ws://{}:{}",
        "✓".green(),
        config.server.bind,
        config.server.port
    );
    if headless {
        eprintln!("  Headless mode: accepting connections from any host");
    }
    eprintln!("  Close stdin ({}) to stop", "Ctrl+D".cyan());

    let mut node = ServerNode::websocket(config.server_config()?);
    run_stdio(&mut node).await?;
    Ok(())
}

/// Browse a node once and print what was found.
pub async fn browse(
    config: Option<&Path>,
    root: Option<&str>,
    endpoint: Option<String>,
    json: bool,
) -> Result<()> {
    let config = FlowConfig::load(config)?;
    let endpoint = endpoint.unwrap_or(config.browser.endpoint.clone());
    let root: NodeId = match root {
        Some(root) => root.parse()?,
        None => DEFAULT_ROOT,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Browsing {} on {}...", root, endpoint));

    let outcome = BrowseSession::new(WsProtocolClient::default(), endpoint.as_str())
        .with_step_timeout(config.browser.step_timeout())
        .run(&root)
        .await;

    spinner.finish_and_clear();
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.items)?);
    } else if outcome.items.is_empty() {
        println!("No references under {}", root);
    } else {
        println!("{} {} references under {}:\n", "✓".green(), outcome.items.len(), root);
        for item in &outcome.items {
            println!(
                "  {} {} {}",
                item.node_class.to_string().yellow(),
                item.browse_name.cyan(),
                format!("({})", item.node_id).dimmed()
            );
        }
    }

    if let Some(e) = outcome.close_error {
        eprintln!("{} {}", "⚠".yellow(), e);
    }
    Ok(())
}

/// Run the browser node on stdin/stdout.
pub async fn browser(
    config: Option<&Path>,
    endpoint: Option<String>,
    topic: Option<String>,
) -> Result<()> {
    let mut config = FlowConfig::load(config)?;
    if let Some(endpoint) = endpoint {
        config.browser.endpoint = endpoint;
    }
    if topic.is_some() {
        config.browser.topic = topic;
    }

    eprintln!("{} Browsing {}", "✓".green(), config.browser.endpoint);

    let mut node = BrowserNode::websocket(&config.browser);
    run_stdio(&mut node).await?;
    Ok(())
}
