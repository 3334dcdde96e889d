use anyhow::Context;
use tickerhub_server::{FeedKind, ServerConfig, TickerHub, shutdown_channel};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"tickerhub - real-time price relay

USAGE:
    tickerhub [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Load configuration from JSON file
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                    Server host (default: 0.0.0.0)
    PORT                    Server port (default: 8080)
    FINNHUB_API_KEY         Use the external trade feed instead of simulation
    FINNHUB_WS_URL          External feed endpoint (default: wss://ws.finnhub.io)
    FEED_SYMBOLS            Comma-separated symbols for the external feed
    SIMULATION_INTERVAL_MS  Simulated tick interval (default: 2000)
    RUST_LOG                Log level filter

EXAMPLES:
    # Simulated prices on the default port
    tickerhub

    # Live trades
    FINNHUB_API_KEY=... tickerhub

    # Run with config file
    tickerhub --config tickerhub.json
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickerhub_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // TLS for wss:// feed endpoints
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            ServerConfig::from_file(&path)?
        }
        None => {
            tracing::info!("Using default configuration");
            ServerConfig::default()
        }
    }
    .with_env_overrides()?;

    match config.feed_kind() {
        FeedKind::External => tracing::info!(
            "Feed: external ({} symbols)",
            config.external_feed.symbols.len()
        ),
        FeedKind::Simulated => tracing::info!(
            "Feed: simulated (every {} ms)",
            config.simulation.interval_ms
        ),
    }

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl-C received, shutting down");
                trigger.trigger();
            }
            Err(e) => {
                // Dropping the trigger would stop the server
                tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    let addr = config.bind_addr();
    TickerHub::new(config)
        .run(shutdown)
        .await
        .with_context(|| format!("server on {} failed", addr))
}
