//! Demo application.
//!
//! Serves a single JSON endpoint:
//!
//! ```text
//! POST /  →  200 {"status": "success"}
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use qflask::config::{load_config, AppConfig};
use qflask::http::Method;
use qflask::observability::{logging, metrics};
use qflask::{App, BoxError, Request, RuleOptions, RunOptions, ViewArgs};

#[derive(Parser, Debug)]
#[command(name = "qflask", version, about = "Run the qflask demo application")]
struct Cli {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Verbose logging and error details in 500 responses
    #[arg(long)]
    debug: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn helloworld(_request: &Request, _args: &ViewArgs) -> Result<serde_json::Value, BoxError> {
    Ok(json!({"status": "success"}))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    let debug = cli.debug || config.debug;

    logging::init(&config.observability, debug)?;
    tracing::info!("qflask v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut app = App::with_config(config);
    app.add_url_rule(
        "/",
        None,
        Some(qflask::View::new(helloworld)),
        RuleOptions::new().methods([Method::POST]),
    )?;

    app.run(RunOptions {
        host: Some(cli.host),
        port: Some(cli.port),
        debug: cli.debug.then_some(true),
    })
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
