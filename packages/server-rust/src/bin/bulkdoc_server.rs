//! bulkdoc server
//!
//! Serves schema-driven validation and bulk create/update/upsert/delete over
//! HTTP, backed by in-memory record collections seeded from schema files.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bulkdoc_server::network::{NetworkConfig, NetworkModule, TlsConfig};
use bulkdoc_server::service::{BulkConfig, DocumentService, ServerConfig};
use bulkdoc_server::storage::{read_schema_file, MemoryCollections};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(long, env = "BULKDOC_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "BULKDOC_PORT", default_value_t = 8108)]
    port: u16,

    /// Log level, used when `RUST_LOG` is unset
    #[arg(short, long, env = "BULKDOC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "BULKDOC_JSON_LOGS")]
    json_logs: bool,

    /// Store calls in flight per batch
    #[arg(long, env = "BULKDOC_DISPATCH_CONCURRENCY", default_value_t = 4)]
    dispatch_concurrency: usize,

    /// Errors shown in a summary before collapsing the rest
    #[arg(long, env = "BULKDOC_ERROR_PREVIEW", default_value_t = 5)]
    error_preview_limit: usize,

    /// Largest batch accepted, in documents
    #[arg(long, env = "BULKDOC_MAX_BATCH_DOCUMENTS", default_value_t = 10_000)]
    max_batch_documents: usize,

    /// Largest request body, in bytes
    #[arg(long, env = "BULKDOC_MAX_BODY_BYTES", default_value_t = 32 * 1024 * 1024)]
    max_body_bytes: usize,

    /// Request timeout in seconds
    #[arg(long, env = "BULKDOC_REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    request_timeout_secs: u64,

    /// Allowed CORS origin (repeatable; `*` allows any)
    #[arg(
        long = "cors-origin",
        env = "BULKDOC_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    cors_origins: Vec<String>,

    /// Prometheus exporter listen address
    #[arg(long, env = "BULKDOC_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// TLS certificate (PEM); requires --tls-key
    #[arg(long, env = "BULKDOC_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long, env = "BULKDOC_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Collection schema file to register at startup (repeatable)
    #[arg(long = "schema")]
    schemas: Vec<PathBuf>,
}

impl Args {
    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_body_bytes,
            ..NetworkConfig::default()
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bulk: BulkConfig {
                dispatch_concurrency: self.dispatch_concurrency,
                error_preview_limit: self.error_preview_limit,
                max_batch_documents: self.max_batch_documents,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    info!("starting bulkdoc server v{}", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = args.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("failed to start metrics exporter: {e}"))?;
        info!(%addr, "prometheus exporter listening");
    }

    let store = Arc::new(MemoryCollections::new());
    for path in &args.schemas {
        let snapshot = store.create_collection(read_schema_file(path)?)?;
        info!(
            collection = %snapshot.schema.name,
            path = %path.display(),
            "schema registered"
        );
    }
    if args.schemas.is_empty() {
        warn!("no --schema given; every collection lookup will fail");
    }

    let service = Arc::new(DocumentService::new(store, args.server_config()));
    let mut network = NetworkModule::new(args.network_config(), service);
    let port = network.start().await?;
    info!(port, "bulkdoc server ready");

    network.serve(shutdown_signal()).await?;
    info!("bulkdoc server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }
    Ok(())
}
