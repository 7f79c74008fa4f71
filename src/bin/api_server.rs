//! REST API server for shop activity reports
//!
//! Usage:
//!   ./target/release/api_server [--port PORT] [--input PATH]
//!
//! REST endpoints:
//!   GET  /api/v1/health              - Health check
//!   GET  /api/v1/stats               - Log statistics
//!   GET  /api/v1/employees           - Employees present in the log
//!   GET  /api/v1/reports/:employee   - Monthly report (404 when no data)
//!   POST /api/v1/refresh             - Reload the log from disk

use anyhow::{Context, Result};
use clap::Parser;
use shop_activity::api::{self, ReportService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve shop activity reports over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "SHOP_ACTIVITY_PORT", default_value = "8080")]
    port: u16,

    /// Transaction log CSV
    #[arg(long, env = "SHOP_ACTIVITY_LOG", default_value = "data/transactions.csv")]
    input: PathBuf,
}

fn print_banner(port: u16, input: &std::path::Path) {
    println!("============================================================");
    println!("         SHOP ACTIVITY REPORT SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  Log:      {}", input.display());
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health              Health check");
    println!("  GET  /api/v1/stats               Log statistics");
    println!("  GET  /api/v1/employees           Employees");
    println!("  GET  /api/v1/reports/:employee   Monthly report");
    println!("  POST /api/v1/refresh             Reload log");
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    print_banner(args.port, &args.input);

    let service = Arc::new(ReportService::new(&args.input));
    // Load once up front so a bad path fails at startup
    let stats = service
        .stats()
        .await
        .context("initial load of the transaction log failed")?;
    tracing::info!(
        "Loaded {} transactions for {} employees",
        stats.transactions,
        stats.employees
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let app = api::router(service);
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
