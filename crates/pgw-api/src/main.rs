//! # pgw-api — Binary Entry Point
//!
//! `pgw-api serve` loads the configured contracts and starts the HTTP
//! server (default port 3000). `pgw-api check` only loads and
//! self-validates contracts. Either exits non-zero when a contract fails
//! to load, so a broken contract set never serves traffic.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use pgw_api::config::{AppConfig, LogFormat};
use pgw_api::{build_gateway, AppState};
use pgw_gateway::MatchPolicy;
use tracing_subscriber::EnvFilter;

/// Contract-validation gateway.
///
/// Admits a request only when a registered OpenAPI contract declares its
/// route and the request conforms to that operation.
#[derive(Parser, Debug)]
#[command(name = "pgw-api", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load contracts and serve HTTP traffic (the default).
    Serve(ServeArgs),

    /// Load and self-validate contracts, print a summary, and exit.
    Check(ContractArgs),
}

#[derive(Args, Debug, Default)]
struct ContractArgs {
    /// Contract file, in registration order. Repeat for several contracts.
    /// Overrides PGW_CONTRACTS.
    #[arg(long = "contract", value_name = "FILE")]
    contracts: Vec<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    #[command(flatten)]
    contracts: ContractArgs,

    /// Port to listen on. Overrides APP_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// first-pass-wins or reject-on-first-match. Overrides PGW_MATCH_POLICY.
    #[arg(long)]
    policy: Option<MatchPolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env();
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());
    let mut config = config.map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;

    match cli.command.unwrap_or_else(|| Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            apply_contracts(&mut config, args.contracts);
            if let Some(port) = args.port {
                config.port = port;
            }
            if let Some(policy) = args.policy {
                config.match_policy = policy;
            }
            serve(config).await
        }
        Commands::Check(args) => {
            apply_contracts(&mut config, args);
            check(&config)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn apply_contracts(config: &mut AppConfig, args: ContractArgs) {
    if !args.contracts.is_empty() {
        config.contracts = args.contracts;
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let gateway = build_gateway(&config).map_err(|e| {
        tracing::error!(error = %e, "contract load failed, refusing to serve");
        e
    })?;

    let mut state = AppState::new(gateway).with_body_limit(config.body_limit);
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("failed to install the Prometheus recorder")?;
        state = state.with_metrics(handle);
    }

    let app = pgw_api::app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        %addr,
        contracts = config.contracts.len(),
        policy = %config.match_policy,
        metrics = config.metrics_enabled,
        "gateway listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn check(config: &AppConfig) -> anyhow::Result<()> {
    let gateway = build_gateway(config).map_err(|e| {
        tracing::error!(error = %e, "contract check failed");
        e
    })?;
    for summary in gateway.registry().summaries() {
        println!(
            "ok  {}  {} {}  ({} routes, {} operations)",
            summary.name, summary.title, summary.version, summary.routes, summary.operations
        );
    }
    Ok(())
}
