//! PII Shield server and command line scanner
//!
//! This binary provides:
//! - `serve`: HTTP API for detection, masking and prompt sanitization
//! - `scan`: mask a file or stdin without starting a server
//!
//! Usage:
//! ```bash
//! # With config file
//! piishield --config piishield.yaml
//!
//! # Or with environment variables
//! PIISHIELD_PORT=9000 PIISHIELD_HASH_SECRET=pepper piishield serve
//!
//! # Flags override both
//! piishield serve --host 0.0.0.0 --port 9001 --log-level debug
//!
//! # Mask a file, hashing emails
//! piishield scan --file notes.txt --strategy EMAIL=HASH
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:8000/v1/detect \
//!   -H "Content-Type: application/json" \
//!   -d '{"text": "My SSN is 123-45-6789, email j@x.com", "mask": true}'
//! ```

mod api;
mod config;
mod error;
mod scan;

use clap::{Args, Parser, Subcommand};
use config::ServerConfig;
use piishield_observability::{
    ComponentStatus, HealthState, Metrics, ReadinessChecker, health_router,
};
use piishield_pii::PIIShield;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const VERSION: &str = env!("VERSION");
const SHA: &str = env!("SHA");

/// PII Shield - detect and mask personal data
#[derive(Parser)]
#[command(name = "piishield")]
#[command(about = "PII detection and masking service", long_about = None)]
#[command(version = concat!(env!("VERSION"), " (", env!("SHA"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "PIISHIELD_CONFIG",
        global = true
    )]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default if no command specified)
    Serve(ServeArgs),
    /// Mask a file or stdin and print the result
    Scan {
        /// Read from this file instead of stdin
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Minimum confidence for reported matches
        #[arg(long, value_name = "F")]
        threshold: Option<f32>,

        /// Masking strategy override, e.g. EMAIL=FULL (repeatable)
        #[arg(long = "strategy", value_name = "TYPE=STRATEGY")]
        strategies: Vec<String>,

        /// Print a JSON report instead of masked text
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the server settings; highest precedence
#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl ServeArgs {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

/// Ready once the listener is bound, and no longer ready while draining
struct ServerReadiness {
    patterns: usize,
    accepting: AtomicBool,
}

impl ServerReadiness {
    fn new(patterns: usize) -> Self {
        Self {
            patterns,
            accepting: AtomicBool::new(false),
        }
    }

    fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }
}

impl ReadinessChecker for ServerReadiness {
    fn is_ready(&self) -> bool {
        self.patterns > 0 && self.accepting.load(Ordering::SeqCst)
    }

    fn component_statuses(&self) -> Vec<ComponentStatus> {
        let accepting = self.accepting.load(Ordering::SeqCst);
        vec![
            ComponentStatus {
                name: "pattern_registry".to_string(),
                status: if self.patterns > 0 { "loaded" } else { "empty" }.to_string(),
                detail: Some(format!("{} patterns", self.patterns)),
            },
            ComponentStatus {
                name: "listener".to_string(),
                status: if accepting { "accepting" } else { "closed" }.to_string(),
                detail: None,
            },
        ]
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    // Environment variables override the file
    config.merge_env();
    Ok(config)
}

fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG directives refine the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if config.logging.json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    let serve_args = match cli.command {
        Some(Commands::Scan {
            file,
            threshold,
            strategies,
            json,
        }) => {
            let shield = PIIShield::new()?;
            let options = scan::ScanOptions {
                file,
                threshold,
                strategies,
                json,
            };
            let detection = config.to_detection_config()?;
            return scan::run(&shield, detection, &options);
        }
        Some(Commands::Serve(args)) => args,
        None => ServeArgs::default(),
    };
    serve_args.apply(&mut config);
    let detection = config.to_detection_config()?;

    init_tracing(&config)?;
    info!("🛡️  Starting PII Shield {} ({})", VERSION, SHA);
    match &cli.config {
        Some(path) => info!("📁 Loaded configuration from: {}", path),
        None => info!("📁 Using default configuration"),
    }

    let shield = Arc::new(PIIShield::new()?);
    let patterns = shield.registry().list_patterns().len();
    let enabled = shield.supported_types(&detection);
    info!(
        "✓ Compiled {} patterns, {} types enabled, threshold {}",
        patterns,
        enabled.len(),
        detection.confidence_threshold
    );
    if detection.hash_secret.is_none() {
        info!("   HASH masking uses unkeyed SHA-256 (set PIISHIELD_HASH_SECRET to key it)");
    }

    let metrics = Arc::new(Metrics::new()?);
    metrics.set_patterns_loaded(patterns);

    let readiness = Arc::new(ServerReadiness::new(patterns));
    let health_state = HealthState::with_readiness_checker(metrics.clone(), readiness.clone())
        .with_version(VERSION);

    let state = api::AppState::new(shield, detection, metrics, &config.server);
    let app = api::router(state)
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    readiness.set_accepting(true);

    info!("");
    info!("✅ PII Shield listening on http://{}", addr);
    info!("   API endpoints:");
    info!("   - Detect:   POST http://{}/v1/detect", addr);
    info!("   - Mask:     POST http://{}/v1/mask", addr);
    info!("   - Sanitize: POST http://{}/v1/sanitize", addr);
    info!("   - Batch:    POST http://{}/v1/batch", addr);
    info!("   - Types:    GET  http://{}/v1/types", addr);
    info!("   Observability:");
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);
    info!("");

    let draining = readiness.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // In-flight requests finish; /readyz reports 503 meanwhile
            draining.set_accepting(false);
        })
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
