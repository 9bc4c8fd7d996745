use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dfjob::config::Config;
use dfjob::gcp;
use dfjob::gcp::client::GcpClient;
use dfjob::resource::{
    map_on_delete, plan, JobConfig, JobResourceAdapter, Plan, ProviderContext, ReadOutcome,
    StateStore,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Manage a Dataflow template job declaratively
#[derive(Parser, Debug)]
#[command(name = "dfjob", version, about, long_about = None)]
struct Args {
    /// GCP project used when the declaration does not set one
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Path of the state file
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    /// Dataflow API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a declaration without contacting Dataflow
    Validate {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show what apply would do
    Plan {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Launch, replace or refresh the job to match the declaration
    Apply {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Re-read the tracked job's state
    Refresh,
    /// Cancel or drain the tracked job and forget it
    Destroy,
    /// Print the tracked record
    Show,
    /// Store a default project in the config file
    SetProject { project: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(level: LogLevel) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dfjob={}", level.as_directive())));

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let result = run(args).await;
    if let Err(err) = &result {
        tracing::debug!("{:?}", err);
        eprintln!("Error: {}", gcp::http::format_gcp_error(err));
    }

    // Flush buffered log lines before a non-zero exit
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    let store = StateStore::new(args.state.clone().unwrap_or_else(StateStore::default_path));
    let ctx = ProviderContext::new(config.effective_project(args.project.as_deref()));
    let endpoint = config.effective_endpoint(args.endpoint.as_deref());

    tracing::info!(
        "Using project: {:?}, state: {}",
        ctx.default_project,
        store.path().display()
    );

    match args.command {
        Command::Validate { file } => {
            let declared = JobConfig::load(&file)?;
            println!(
                "{} is valid; on delete the job is moved to {}",
                declared.name,
                map_on_delete(declared.on_delete.as_str())?
            );
        }
        Command::Plan { file } => {
            let declared = JobConfig::load(&file)?;
            let record = store.load()?;
            println!("{}: {}", declared.name, plan(&declared, &record));
        }
        Command::Apply { file } => {
            let declared = JobConfig::load(&file)?;
            let adapter = connect(endpoint.as_deref()).await?;
            apply(&adapter, &declared, &store, &ctx).await?;
        }
        Command::Refresh => {
            let adapter = connect(endpoint.as_deref()).await?;
            let mut record = store.load()?;
            if !record.is_tracked() {
                println!("No job tracked");
                return Ok(());
            }
            let outcome = adapter.read(&mut record, &ctx).await?;
            store.save(&record)?;
            match outcome {
                ReadOutcome::Present => println!("{}", record.state.as_deref().unwrap_or("-")),
                ReadOutcome::Removed => println!("Job no longer exists; removed from state"),
            }
        }
        Command::Destroy => {
            let adapter = connect(endpoint.as_deref()).await?;
            let mut record = store.load()?;
            if !record.is_tracked() {
                println!("No job tracked");
                return Ok(());
            }
            adapter.delete(&record, &ctx).await?;
            let id = record.id.take().unwrap_or_default();
            record.clear();
            store.save(&record)?;
            println!("Requested stop of job {}", id);
        }
        Command::Show => {
            let record = store.load()?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::SetProject { project } => {
            if !gcp::auth::validate_project_id(&project) {
                anyhow::bail!("Invalid project ID: {}", project);
            }
            config.set_project(&project)?;
            println!("Default project set to {}", project);
        }
    }

    Ok(())
}

async fn connect(endpoint: Option<&str>) -> Result<JobResourceAdapter<GcpClient>> {
    let client = GcpClient::new(endpoint)
        .await
        .context("Failed to connect to Dataflow")?;
    Ok(JobResourceAdapter::new(client))
}

/// One reconciliation pass: state is saved after every remote effect
async fn apply(
    adapter: &JobResourceAdapter<GcpClient>,
    declared: &JobConfig,
    store: &StateStore,
    ctx: &ProviderContext,
) -> Result<()> {
    let mut record = store.load()?;

    match plan(declared, &record) {
        Plan::Create => {}
        Plan::Refresh => {
            if adapter.read(&mut record, ctx).await? == ReadOutcome::Present {
                store.save(&record)?;
                println!(
                    "{}: {}",
                    declared.name,
                    record.state.as_deref().unwrap_or("-")
                );
                return Ok(());
            }
            store.save(&record)?;
            println!("{}: job disappeared, launching again", declared.name);
        }
        Plan::Replace { fields } => {
            println!("{}: replacing ({} changed)", declared.name, fields.join(", "));
            adapter.delete(&record, ctx).await?;
            record.clear();
            store.save(&record)?;
        }
    }

    let result = adapter.create(declared, &mut record, ctx).await;
    // A failed follow-up read still leaves a created job worth remembering
    if record.is_tracked() {
        store.save(&record)?;
    }
    result?;

    println!(
        "{}: created job {} ({})",
        declared.name,
        record.id.as_deref().unwrap_or("-"),
        record.state.as_deref().unwrap_or("-")
    );
    Ok(())
}
