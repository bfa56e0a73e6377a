//! WMS layer command line tool.
//!
//! Exercises the layer source outside a map host:
//! - `discover`: list the configured services and their layers
//! - `columns`: describe a layer's WFS columns
//! - `tile-url`: build the GetMap tile template for a descriptor and filters
//! - `feature-info`: run a click query and print the tooltip

mod commands;
mod config_loader;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use layer_source::{ClientConfig, OgcClient};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "wms-layer")]
#[command(about = "WMS layer discovery, tile URLs and click queries")]
struct Args {
    /// Plugin configuration (YAML)
    #[arg(long, env = "WMS_LAYER_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "WMS_LAYER_TIMEOUT", default_value = "30")]
    timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List services and layers
    Discover {
        /// Service URL; repeat to query several. Defaults to the configured services.
        #[arg(long = "url")]
        urls: Vec<String>,
    },

    /// Describe a layer's columns
    Columns {
        #[arg(long)]
        url: String,
        #[arg(long)]
        layer: String,
    },

    /// Build a tile URL template
    TileUrl(commands::TileUrlArgs),

    /// Query the features under a point
    FeatureInfo(commands::FeatureInfoArgs),
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;
    debug!(?args, "Starting wms-layer");

    let client = OgcClient::new(&ClientConfig {
        request_timeout: std::time::Duration::from_secs(args.timeout_secs),
        ..ClientConfig::default()
    })?;

    match args.command {
        Command::Discover { urls } => {
            let config = config_loader::load_plugin_config(args.config.as_deref())?;
            commands::discover(&client, &config, urls).await
        }
        Command::Columns { url, layer } => commands::columns(&client, &url, &layer).await,
        Command::TileUrl(tile_args) => commands::tile_url(&tile_args),
        Command::FeatureInfo(info_args) => commands::feature_info(&client, &info_args).await,
    }
}
