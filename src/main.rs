use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcpsync::config::Config;
use gcpsync::gcp::client::GcpClient;
use gcpsync::gcp::transport::Transport;
use gcpsync::resource::{
    ComputeAddress, ComputeRoute, ProviderContext, ReadOutcome, ResourceController, ResourceData,
    ResourceKind,
};
use gcpsync::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Reconcile Compute Engine addresses and routes
#[derive(Parser, Debug)]
#[command(name = "gcpsync", version, about, long_about = None)]
struct Args {
    /// Default GCP project
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Default GCP region
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Default GCP zone
    #[arg(short, long, global = true)]
    zone: Option<String>,

    /// OAuth access token to use instead of Application Default Credentials
    /// (also read from GOOGLE_OAUTH_ACCESS_TOKEN)
    #[arg(long, global = true)]
    access_token: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the object declared in a YAML or JSON file
    Create {
        kind: Kind,
        /// Desired state file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show the current state of an object by id
    Read { kind: Kind, id: String },
    /// Delete an object by id
    Delete { kind: Kind, id: String },
    /// Bring an existing object under management and show its state
    Import { kind: Kind, import_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Address,
    Route,
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
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcpsync started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcpsync").join("gcpsync.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcpsync").join("gcpsync.log");
    }
    PathBuf::from("gcpsync.log")
}

async fn build_context(args: &Args, config: &Config) -> Result<ProviderContext> {
    let defaults = config.defaults(
        args.project.as_deref(),
        args.region.as_deref(),
        args.zone.as_deref(),
    );
    tracing::info!(
        "Using project: {:?}, region: {:?}, zone: {:?}",
        defaults.project,
        defaults.region,
        defaults.zone
    );

    let token = args
        .access_token
        .clone()
        .or_else(|| std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok());
    let client = match token {
        Some(token) => GcpClient::with_access_token(token)?,
        None => GcpClient::new().await?,
    };
    let transport: Arc<dyn Transport> = Arc::new(client);

    let mut ctx = ProviderContext::new(transport, defaults);
    if let Some(endpoint) = &config.compute_endpoint {
        ctx = ctx.with_compute_endpoint(endpoint.clone());
    }
    if let Some(timeout) = config.operation_timeout() {
        ctx = ctx.with_operation_timeout(timeout);
    }
    if let Some(interval) = config.poll_interval() {
        ctx = ctx.with_poll_interval(interval);
    }
    Ok(ctx)
}

fn load_desired<S: serde::de::DeserializeOwned>(path: &Path) -> Result<S> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    // YAML is a superset of JSON, so one parser covers both
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse desired state in {:?}", path))
}

fn print_state<S: serde::Serialize>(data: &ResourceData<S>) -> Result<()> {
    print!("{}", serde_yaml::to_string(data).context("Failed to render state")?);
    Ok(())
}

fn explain(err: gcpsync::Error) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::Timeout => " (the object may or may not exist; run `read` before retrying)",
        ErrorKind::Operation => " (nothing was recorded)",
        _ if err.is_retryable() => " (temporary failure; safe to retry)",
        _ => "",
    };
    anyhow::anyhow!("{}{}", err, hint)
}

async fn run<K: ResourceKind>(kind: K, ctx: &ProviderContext, command: Command) -> Result<()> {
    let controller = ResourceController::new(kind);

    match command {
        Command::Create { file, .. } => {
            let mut data = ResourceData::desired(load_desired::<K::State>(&file)?);
            let id = controller.create(ctx, &mut data).await.map_err(explain)?;
            if !data.is_present() {
                anyhow::bail!("{} {} was created but could not be read back", K::NAME, id);
            }
            print_state(&data)
        },
        Command::Read { id, .. } => {
            let mut data = ResourceData {
                id: Some(id.clone()),
                state: K::State::default(),
            };
            match controller.read(ctx, &mut data).await.map_err(explain)? {
                ReadOutcome::Present => print_state(&data),
                ReadOutcome::Absent => {
                    println!("{} {} does not exist", K::NAME, id);
                    Ok(())
                },
            }
        },
        Command::Delete { id, .. } => {
            let mut data = ResourceData {
                id: Some(id.clone()),
                state: K::State::default(),
            };
            controller.delete(ctx, &mut data).await.map_err(explain)?;
            println!("Deleted {} {}", K::NAME, id);
            Ok(())
        },
        Command::Import { import_id, .. } => {
            let mut data = controller.import(ctx, &import_id).map_err(explain)?;
            match controller.read(ctx, &mut data).await.map_err(explain)? {
                ReadOutcome::Present => print_state(&data),
                ReadOutcome::Absent => Err(anyhow::anyhow!(
                    "Cannot import non-existent {} {:?}",
                    K::NAME,
                    import_id
                )),
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = Config::load();
    let ctx = build_context(&args, &config).await?;

    let kind = match &args.command {
        Command::Create { kind, .. }
        | Command::Read { kind, .. }
        | Command::Delete { kind, .. }
        | Command::Import { kind, .. } => *kind,
    };

    match kind {
        Kind::Address => run(ComputeAddress, &ctx, args.command).await,
        Kind::Route => run(ComputeRoute, &ctx, args.command).await,
    }
}
