use std::path::PathBuf;

use anyhow::{Context, Result};
use api::{ComponentRegistry, Environment, create_router};
use clap::Parser;
use common::Config;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const DEFAULT_CONFIG: &str = "jelly.yaml";

/// Web service with pre-rolled user accounts
#[derive(Debug, Parser)]
#[command(name = "jelly", version, about)]
struct Cli {
    /// Configuration file (YAML or JSON) [default: jelly.yaml if present]
    #[arg(short, long, env = "JELLY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding server.address
    #[arg(long)]
    address: Option<String>,

    /// Port to listen on, overriding server.port
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG);
                default.exists().then_some(default)
            }
        };

        let mut config = Config::load(path.as_deref()).with_context(|| match &path {
            Some(path) => format!("failed to load {}", path.display()),
            None => "failed to load configuration from the environment".to_string(),
        })?;

        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    common::logging::init(&config.log)?;

    if cli.config.is_none() && !PathBuf::from(DEFAULT_CONFIG).exists() {
        warn!("No {} found; running on defaults and environment", DEFAULT_CONFIG);
    }

    let bind = config.server.bind_address();
    let connectors = auth::repositories::connector_registry();
    let env = Environment::build(config, &connectors).await?;
    let app = create_router(&env, &ComponentRegistry::with_defaults())?;

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!("jelly listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = env.auth.service.store().close().await {
        error!("Failed to close credential store: {}", e);
    }
    info!("jelly stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
