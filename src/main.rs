use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use visage_gateway::{AppState, Config, routes};

/// Visage Gateway - conversational avatar response server
#[derive(Parser, Debug)]
#[command(name = "visage-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bind host override
    #[arg(long = "host", value_name = "HOST")]
    host: Option<String>,

    /// Bind port override
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing (honors RUST_LOG)
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Layered configuration: defaults, then environment, then file
    let mut config = Config::from_env()?;
    let config_file = cli
        .config
        .or_else(|| std::env::var("VISAGE_CONFIG_FILE").ok().map(PathBuf::from));
    if let Some(path) = config_file {
        info!(path = %path.display(), "applying configuration file");
        config.apply_yaml_file(&path)?;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let cors_layer = build_cors_layer(&config.server.cors_origins);

    // Create application state (adapters, cache, orchestrator)
    let state = Arc::new(AppState::new(config)?);

    let app = Router::new()
        .merge(routes::create_api_router())
        .merge(routes::create_avatar_router())
        .with_state(state)
        .layer(cors_layer);

    let listener = TcpListener::bind(&address).await?;
    info!(address = %listener.local_addr()?, "visage gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Configure CORS from the origin list; a literal `"*"` opens the server
/// to any origin (without credentials).
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(false)
    } else {
        // Origins were validated at config load; unparseable ones are
        // dropped rather than taking the server down
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_credentials(true)
    }
}
