use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use taskgrid::config::{CoordinatorConfig, ExecutorConfig, RunnerConfig};
use taskgrid::coordinator::api::{
    CoordinatorStatsResponse, DistributeResponse, RegisterResponse, WorkersResponse,
};
use taskgrid::coordinator::Coordinator;
use taskgrid::executor::api::TaskListResponse;
use taskgrid::executor::{Executor, Task};
use taskgrid::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "taskgrid")]
#[command(version)]
#[command(about = "A distributed task execution grid with sandboxed code execution")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a coordinator node
    Coordinator(CoordinatorArgs),

    /// Start an executor node
    Executor(ExecutorArgs),

    /// Worker management commands (against a coordinator)
    Worker {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Task commands (submit against a coordinator, poll against an executor)
    Task {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: TaskCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct CoordinatorArgs {
    /// Address to bind the coordinator API on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the coordinator API
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Seconds between heartbeat cycles
    #[arg(long, default_value = "30")]
    heartbeat_interval: u64,

    /// Per-probe health check timeout in seconds
    #[arg(long, default_value = "5")]
    probe_timeout: u64,

    /// Task forwarding timeout in seconds
    #[arg(long, default_value = "10")]
    dispatch_timeout: u64,
}

#[derive(Parser, Debug)]
struct ExecutorArgs {
    /// Address to bind the executor API on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the executor API
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Worker display name
    #[arg(long, default_value = "worker")]
    name: String,

    /// Coordinator base URL to register with on startup
    #[arg(long)]
    coordinator: Option<String>,

    /// Externally reachable base URL advertised during registration
    /// (defaults to http://{host}:{port})
    #[arg(long, requires = "coordinator")]
    advertise: Option<String>,

    /// Wall-clock timeout for one code execution, in seconds
    #[arg(long, default_value = "30")]
    exec_timeout: u64,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server base URL
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:5000")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum WorkerCommands {
    /// List registered workers
    List,
    /// Register an executor with the coordinator
    Register {
        /// Worker display name
        #[arg(long, default_value = "worker")]
        name: String,
        /// The executor's base URL
        url: String,
    },
    /// Show coordinator statistics
    Stats,
}

#[derive(clap::Subcommand, Debug)]
enum TaskCommands {
    /// Submit a task through the coordinator (-a should point at it)
    Submit {
        /// Task type: code, compute, sleep, or echo
        #[arg(long, short = 't', default_value = "echo")]
        task_type: String,
        /// Task payload as a JSON object
        #[arg(long, short = 'p', default_value = "{}")]
        payload: String,
    },
    /// Get a task's status from the executor that holds it (-a should
    /// point at the executor)
    Status {
        /// The task id (UUID)
        task_id: String,
    },
    /// List tasks on an executor (-a should point at the executor)
    List,
}

// =============================================================================
// Server Entrypoints
// =============================================================================

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = CoordinatorConfig {
        listen_addr,
        heartbeat_interval: Duration::from_secs(args.heartbeat_interval),
        probe_timeout: Duration::from_secs(args.probe_timeout),
        dispatch_timeout: Duration::from_secs(args.dispatch_timeout),
    };

    tracing::info!(
        addr = %config.listen_addr,
        heartbeat_interval = args.heartbeat_interval,
        "Starting taskgrid coordinator"
    );

    let token = install_shutdown_handler();
    Coordinator::new(config).run(token).await
}

async fn run_executor(args: ExecutorArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = ExecutorConfig {
        listen_addr,
        name: args.name,
        coordinator_url: args.coordinator,
        advertise_url: args.advertise,
        runner: RunnerConfig {
            timeout: Duration::from_secs(args.exec_timeout),
            ..RunnerConfig::default()
        },
        ..ExecutorConfig::default()
    };

    tracing::info!(
        addr = %config.listen_addr,
        name = %config.name,
        "Starting taskgrid executor"
    );

    let token = install_shutdown_handler();
    Executor::new(config).run(token).await
}

// =============================================================================
// Client Command Handlers
// =============================================================================

fn base_url(args: &ClientArgs) -> String {
    args.addr.trim_end_matches('/').to_string()
}

async fn handle_worker_list(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response: WorkersResponse = reqwest::get(format!("{}/workers", base_url(client)))
        .await?
        .error_for_status()?
        .json()
        .await?;

    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            if response.workers.is_empty() {
                println!("No workers registered.");
            } else {
                println!("{:<20} {:<10} {:<28} TASKS", "ID", "STATUS", "URL");
                println!("{}", "-".repeat(66));
                for worker in &response.workers {
                    println!(
                        "{:<20} {:<10} {:<28} {}",
                        worker.id,
                        worker.status.to_string(),
                        worker.url,
                        worker.tasks_assigned
                    );
                }
                println!();
                println!("{} workers, {} online", response.total, response.online);
            }
        }
    }
    Ok(())
}

async fn handle_worker_register(
    client: &ClientArgs,
    name: String,
    url: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let http = reqwest::Client::new();
    let response = http
        .post(format!("{}/workers/register", base_url(client)))
        .json(&serde_json::json!({ "name": name, "url": url }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("Error: registration failed ({}): {}", status, body);
        std::process::exit(1);
    }

    let registered: RegisterResponse = response.json().await?;
    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registered)?),
        OutputFormat::Table => {
            println!("Worker registered successfully!");
            println!("Worker ID: {}", registered.id);
        }
    }
    Ok(())
}

async fn handle_worker_stats(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response: CoordinatorStatsResponse = reqwest::get(format!("{}/stats", base_url(client)))
        .await?
        .error_for_status()?
        .json()
        .await?;

    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            println!("Coordinator Statistics");
            println!("{}", "=".repeat(30));
            println!("Started:           {}", response.started_at);
            println!("Tasks distributed: {}", response.total_tasks_distributed);
            println!("Workers:           {}", response.total_workers);
            println!("Online:            {}", response.active_workers);
        }
    }
    Ok(())
}

async fn handle_task_submit(
    client: &ClientArgs,
    task_type: String,
    payload: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload: serde_json::Value = serde_json::from_str(&payload)
        .map_err(|e| format!("payload is not valid JSON: {}", e))?;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("{}/distribute", base_url(client)))
        .json(&serde_json::json!({ "type": task_type, "payload": payload }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("Error: task submission failed ({}): {}", status, body);
        std::process::exit(1);
    }

    let receipt: DistributeResponse = response.json().await?;
    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&receipt)?),
        OutputFormat::Table => {
            println!("Task submitted successfully!");
            println!("Task ID:  {}", receipt.task_id);
            println!("Executor: {}", receipt.executor_id);
            println!("Poll the executor's /tasks/{} for the result", receipt.task_id);
        }
    }
    Ok(())
}

async fn handle_task_status(
    client: &ClientArgs,
    task_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = reqwest::get(format!("{}/tasks/{}", base_url(client), task_id)).await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("Error: status lookup failed ({}): {}", status, body);
        std::process::exit(1);
    }

    let task: Task = response.json().await?;
    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&task)?),
        OutputFormat::Table => {
            println!("Task ID:   {}", task.id);
            println!("Type:      {}", task.task_type);
            println!("Status:    {}", task.status);
            println!("Created:   {}", task.created_at);
            if let Some(completed_at) = task.completed_at {
                println!("Completed: {}", completed_at);
            }
            if let Some(result) = &task.result {
                println!("Result:");
                println!("  {}", serde_json::to_string_pretty(result)?);
            }
            if let Some(error) = &task.error {
                println!("Error:");
                println!("  {}", error);
            }
        }
    }
    Ok(())
}

async fn handle_task_list(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response: TaskListResponse = reqwest::get(format!("{}/tasks", base_url(client)))
        .await?
        .error_for_status()?
        .json()
        .await?;

    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            if response.tasks.is_empty() {
                println!("No tasks found.");
            } else {
                println!("{:<38} {:<10} TYPE", "TASK ID", "STATUS");
                println!("{}", "-".repeat(58));
                for task in &response.tasks {
                    println!("{:<38} {:<10} {}", task.id, task.status.to_string(), task.task_type);
                }
                println!();
                println!("Showing {} of {} tasks", response.tasks.len(), response.total);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Coordinator(server_args) => run_coordinator(server_args).await?,
        Commands::Executor(server_args) => run_executor(server_args).await?,
        Commands::Worker { client, command } => match command {
            WorkerCommands::List => handle_worker_list(&client).await?,
            WorkerCommands::Register { name, url } => {
                handle_worker_register(&client, name, url).await?
            }
            WorkerCommands::Stats => handle_worker_stats(&client).await?,
        },
        Commands::Task { client, command } => match command {
            TaskCommands::Submit { task_type, payload } => {
                handle_task_submit(&client, task_type, payload).await?
            }
            TaskCommands::Status { task_id } => handle_task_status(&client, task_id).await?,
            TaskCommands::List => handle_task_list(&client).await?,
        },
    }

    Ok(())
}
