//! AgentRun CLI - Command line interface for the AgentRun server.

mod client;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agentrun_core::{RunId, RunSummary};

use client::{describe, AgentClient, ControlAction, ControlReply};

/// AgentRun CLI - Run lifecycle control tool
#[derive(Parser)]
#[command(name = "agentrun")]
#[command(about = "CLI for the AgentRun server", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(short, long, env = "AGENTRUN_URL", default_value = "http://127.0.0.1:7788")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new run
    Start {
        /// Task for the agent
        task: String,

        /// Stream the run's events until it finishes
        #[arg(short, long)]
        follow: bool,
    },

    /// Pause a run
    Pause {
        /// Run ID (defaults to the executing run)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Resume a paused run
    Resume {
        /// Run ID (defaults to the executing run)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Pause a running run or resume a paused one
    Toggle {
        /// Run ID (defaults to the executing run)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Stop a run
    Stop {
        /// Run ID (defaults to the executing run)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Stream a run's events
    Stream {
        /// Run ID
        run_id: String,
    },

    /// List runs
    Runs,

    /// List registered settings components
    Components,

    /// List browser tabs exposed by a remote debugging endpoint
    Tabs {
        /// Debugging endpoint (defaults to the server's configured one)
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = AgentClient::new(&cli.server);

    match cli.command {
        Commands::Start { task, follow } => {
            let run_id = client.start(&task).await?;
            println!("Run started: {}", run_id);
            if follow {
                stream(&client, &run_id).await?;
            }
        }
        Commands::Pause { run_id } => {
            control(&client, ControlAction::Pause, run_id).await?;
        }
        Commands::Resume { run_id } => {
            control(&client, ControlAction::Resume, run_id).await?;
        }
        Commands::Toggle { run_id } => {
            control(&client, ControlAction::Toggle, run_id).await?;
        }
        Commands::Stop { run_id } => {
            control(&client, ControlAction::Stop, run_id).await?;
        }
        Commands::Stream { run_id } => {
            stream(&client, &RunId::new(run_id)).await?;
        }
        Commands::Runs => {
            list_runs(&client).await?;
        }
        Commands::Components => {
            let reply = client.components().await?;
            println!("{} component(s)", reply.count);
            for key in reply.keys {
                println!("  {}", key);
            }
        }
        Commands::Tabs { endpoint } => {
            let tabs = client.tabs(endpoint.as_deref()).await?;
            if tabs.is_empty() {
                println!("No tabs found.");
            }
            for tab in tabs {
                println!("{}\n  {}", tab.label, tab.socket_url);
            }
        }
    }

    Ok(())
}

async fn control(
    client: &AgentClient,
    action: ControlAction,
    run_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let run_id = run_id.map(RunId::new);
    let reply = client.control(action, run_id.as_ref()).await?;
    print_control(action, &reply);
    Ok(())
}

fn print_control(action: ControlAction, reply: &ControlReply) {
    match (&reply.run_id, reply.applied) {
        (Some(run_id), true) => match reply.paused {
            Some(paused) => println!("{:?} applied to {} (paused: {})", action, run_id, paused),
            None => println!("{:?} applied to {}", action, run_id),
        },
        _ => println!("No active run."),
    }
}

async fn stream(client: &AgentClient, run_id: &RunId) -> Result<(), Box<dyn std::error::Error>> {
    client
        .stream(run_id, |event| println!("{}", describe(event)))
        .await?;
    Ok(())
}

async fn list_runs(client: &AgentClient) -> Result<(), Box<dyn std::error::Error>> {
    let runs = client.runs().await?;
    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    println!("{} run(s):", runs.len());
    println!();
    for run in &runs {
        print_run(run);
        println!();
    }
    Ok(())
}

fn print_run(run: &RunSummary) {
    println!("  ID:      {}", run.run_id);
    println!("  Status:  {}{}", run.status.as_str(), if run.paused { " (paused)" } else { "" });
    if let Some(task) = &run.task {
        println!("  Task:    {}", task);
    }
    println!("  Created: {}", run.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(finished) = run.finished_at {
        println!("  Ended:   {}", finished.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(error) = &run.error_message {
        println!("  Error:   {}", error);
    }
}
