//! AgentRun server.

use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agentrun_server::{http, AppState, Config, RunnerKind};

/// Run-lifecycle controller with an SSE event stream.
#[derive(Parser, Debug)]
#[command(name = "agentrun-server", about = "AgentRun run-lifecycle controller")]
struct Args {
    /// IP address to bind
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    /// Port to listen on
    #[arg(long, default_value = "7788")]
    port: u16,

    /// Runner executing submitted tasks
    #[arg(long, value_enum, default_value_t = RunnerKind::Simulated)]
    runner: RunnerKind,

    /// Program spawned per run by the command runner
    #[arg(long)]
    runner_program: Option<String>,

    /// Argument passed to the runner program before the task (repeatable)
    #[arg(long = "runner-arg")]
    runner_args: Vec<String>,

    /// Steps produced by the simulated runner
    #[arg(long, default_value = "5")]
    simulated_steps: u64,

    /// Delay between simulated steps in milliseconds
    #[arg(long, default_value = "1000")]
    step_interval_ms: u64,

    /// Runs allowed to execute at once
    #[arg(long, default_value = "1")]
    max_concurrent_runs: usize,

    /// Seconds a finished run stays streamable
    #[arg(long, default_value = "300")]
    run_retention_secs: u64,

    /// Seconds stop waits for a run to wind down
    #[arg(long, default_value = "10")]
    stop_timeout_secs: u64,

    /// Default remote debugging endpoint for tab discovery
    #[arg(long, env = "BROWSER_CDP")]
    cdp_url: Option<String>,

    /// Tab discovery request timeout in milliseconds
    #[arg(long, default_value = "3000")]
    discovery_timeout_ms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: format!("{}:{}", args.ip, args.port),
            runner: args.runner,
            runner_program: args.runner_program,
            runner_args: args.runner_args,
            simulated_steps: args.simulated_steps,
            step_interval: Duration::from_millis(args.step_interval_ms),
            max_concurrent_runs: args.max_concurrent_runs,
            run_retention: Duration::from_secs(args.run_retention_secs),
            stop_timeout: Duration::from_secs(args.stop_timeout_secs),
            cdp_url: args.cdp_url.filter(|url| !url.is_empty()),
            discovery_timeout: Duration::from_millis(args.discovery_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agentrun_server=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    let config = Config::from(args);
    let bind_addr = config.bind_addr.clone();

    info!(
        bind_addr = %bind_addr,
        runner = ?config.runner,
        max_concurrent_runs = config.max_concurrent_runs,
        "Starting AgentRun server"
    );

    let state = AppState::new(config)?;
    let router = http::create_router(state.clone());

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = state.registry.cancel_all().await;
    if cancelled > 0 {
        warn!(cancelled, "Cancelled active runs on shutdown");
    }
    info!("AgentRun server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
