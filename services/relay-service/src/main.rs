//! Relay Service for P2PChat
//!
//! Publishes the domain's user directory, accepts forwarded messages and
//! serves authenticated inboxes.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use p2pchat_relay::RelayServerConfig;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod api;
mod error;
mod service;

use service::RelayService;

/// Relay Service CLI arguments
#[derive(Parser, Debug)]
#[command(name = "relay-service")]
#[command(about = "P2PChat Message Relay")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on (host:port)
    #[arg(short = 'L', long)]
    listen: Option<String>,

    /// Domain usernames are served for
    #[arg(short, long)]
    domain: Option<String>,

    /// JSON file with registered users
    #[arg(short, long)]
    users_file: Option<String>,

    /// Storage path (in-memory if not set)
    #[arg(short, long)]
    storage_path: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Layer command-line overrides over the config file
    fn into_config(self) -> anyhow::Result<RelayServerConfig> {
        let mut config = match &self.config {
            Some(path) => RelayServerConfig::load(path)?,
            None => RelayServerConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listen_address = listen;
        }
        if let Some(domain) = self.domain {
            config.domain = domain;
        }
        if self.users_file.is_some() {
            config.users_file = self.users_file;
        }
        if self.storage_path.is_some() {
            config.storage_path = self.storage_path;
        }

        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }
}

/// Application state
pub struct AppState {
    pub service: Arc<RelayService>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = args.into_config()?;
    info!(
        "Starting Relay Service for {} on {}",
        config.domain, config.listen_address
    );

    let service = Arc::new(RelayService::from_config(&config).context("Failed to open relay")?);
    let app_state = web::Data::new(AppState { service });
    let max_message_size = config.max_message_size;

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(max_message_size))
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind(config.listen_address.as_str())
    .with_context(|| format!("Failed to bind {}", config.listen_address))?
    .run()
    .await?;

    Ok(())
}
