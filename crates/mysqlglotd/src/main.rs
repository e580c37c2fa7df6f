//! mysqlglotd - MySQL metrics exporter daemon.
//!
//! Serves InnoDB compression statistics from `information_schema` in the
//! Prometheus text format. Every scrape runs the enabled collectors against a
//! pooled connection.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

use mysqlglot_core::collector::{QuerySource, Scraper, default_scrapers};
use mysqlglot_core::config::MysqlConfig;
use mysqlglot_core::exporter::{Exporter, content_type};
use mysqlglot_core::mysql::{Pool, PooledConn};

type SharedExporter = Arc<Exporter<Pool>>;

const HEALTH_PATH: &str = "/health";

/// MySQL metrics exporter daemon.
#[derive(Parser)]
#[command(name = "mysqlglotd", about = "MySQL metrics exporter", version = mysqlglot_core::VERSION)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9104", env = "MYSQLGLOT_LISTEN")]
    listen: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics")]
    telemetry_path: String,

    /// Connect, read and write timeout for MySQL in seconds (0 disables).
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Collect metrics from information_schema.innodb_cmp (on unless set to false).
    #[arg(long = "collect.info_schema.innodb_cmp", action = clap::ArgAction::Set)]
    collect_innodb_cmp: Option<bool>,

    /// Collect metrics from information_schema.innodb_cmp_reset (on unless set to false).
    /// Reading this view resets the server-side counters.
    #[arg(long = "collect.info_schema.innodb_cmp_reset", action = clap::ArgAction::Set)]
    collect_innodb_cmp_reset: Option<bool>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Whether `scraper` runs: its `--collect.*` flag if given, else its default.
    fn collects<S: QuerySource>(&self, scraper: &dyn Scraper<S>) -> bool {
        let flag = match scraper.name() {
            "info_schema.innodb_cmp" => self.collect_innodb_cmp,
            "info_schema.innodb_cmp_reset" => self.collect_innodb_cmp_reset,
            _ => None,
        };
        flag.unwrap_or_else(|| scraper.enabled_by_default())
    }

    /// Checks the telemetry path before it reaches the router.
    fn validate_telemetry_path(&self) -> Result<(), String> {
        if !self.telemetry_path.starts_with('/') {
            return Err(format!(
                "telemetry path {:?} must start with '/'",
                self.telemetry_path
            ));
        }
        if self.telemetry_path == HEALTH_PATH {
            return Err(format!(
                "telemetry path {:?} collides with the health endpoint",
                self.telemetry_path
            ));
        }
        Ok(())
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("mysqlglotd={}", level).parse().unwrap())
        .add_directive(format!("mysqlglot_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    if let Err(e) = args.validate_telemetry_path() {
        error!(path = %args.telemetry_path, error = %e, "invalid telemetry path");
        process::exit(1);
    }

    info!("mysqlglotd {} starting", mysqlglot_core::VERSION);

    let config = match MysqlConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid MySQL configuration");
            process::exit(1);
        }
    };

    let timeout = Duration::from_secs(args.timeout);
    let pool = match Pool::new(config.opts(timeout)) {
        Ok(pool) => pool,
        Err(e) => {
            error!(server = %config.describe(), error = %e, "failed to create MySQL pool");
            process::exit(1);
        }
    };

    let scrapers: Vec<Box<dyn Scraper<PooledConn>>> = default_scrapers()
        .into_iter()
        .filter(|s| args.collects(s.as_ref()))
        .collect();

    let exporter = Exporter::new(pool, scrapers);
    info!(
        server = %config.describe(),
        timeout_s = args.timeout,
        collectors = ?exporter.scraper_names(),
        "exporter configured"
    );

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve(args, Arc::new(exporter)));
}

async fn serve(args: Args, exporter: SharedExporter) {
    let app = Router::new()
        .route(&args.telemetry_path, get(handle_metrics))
        .route(HEALTH_PATH, get(handle_health))
        .with_state(exporter)
        .layer(CompressionLayer::new());

    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.telemetry_path, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }
    info!("shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_metrics(State(exporter): State<SharedExporter>) -> Response {
    let started = Instant::now();

    // Collectors block on the database; keep them off the async workers.
    let result = tokio::task::spawn_blocking(move || exporter.render()).await;

    match result {
        Ok(Ok(body)) => {
            debug!(
                duration_ms = started.elapsed().as_millis() as u64,
                bytes = body.len(),
                "scrape served"
            );
            ([(header::CONTENT_TYPE, content_type())], body).into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "scrape panicked in spawn_blocking");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
