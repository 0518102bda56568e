use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use freeipa_provider::config::Settings;
use freeipa_provider::{Provider, ProviderError, ResourceData};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Drive the FreeIPA provider from the command line
#[derive(Parser, Debug)]
#[command(name = "freeipa-provider", version, about, long_about = None)]
struct Args {
    /// Settings file holding the provider block (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the provider, resource and data source schemas
    Schema,
    /// Read a data source
    ReadData { type_name: String, state: String },
    /// Create a resource from planned state
    Create { type_name: String, state: String },
    /// Refresh a resource's state
    Read { type_name: String, state: String },
    /// Update a resource from prior to planned state
    Update {
        type_name: String,
        prior: String,
        planned: String,
    },
    /// Delete a resource
    Delete { type_name: String, state: String },
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
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("freeipa-provider started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("freeipa-provider").join("freeipa-provider.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".freeipa-provider").join("freeipa-provider.log");
    }
    PathBuf::from("freeipa-provider.log")
}

fn parse_state(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid state JSON: {}", raw))
}

fn print_state(data: &ResourceData) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&data.to_json())?);
    Ok(())
}

async fn run(args: Args) -> Result<std::result::Result<(), ProviderError>> {
    let provider = Provider::new();

    if let Command::Schema = args.command {
        println!("{}", serde_json::to_string_pretty(&provider.schema())?);
        return Ok(Ok(()));
    }

    let settings = Settings::load(args.config.as_deref())?;
    let provider_data = match provider.provider_data(settings.provider_block()) {
        Ok(data) => data,
        Err(e) => return Ok(Err(e)),
    };
    let config = provider.configure(&provider_data);

    let outcome = match args.command {
        Command::Schema => Ok(None),
        Command::ReadData { type_name, state } => provider
            .read_data_source(&config, &type_name, parse_state(&state)?)
            .await
            .map(Some),
        Command::Create { type_name, state } => provider
            .create(&config, &type_name, parse_state(&state)?)
            .await
            .map(Some),
        Command::Read { type_name, state } => provider
            .read(&config, &type_name, parse_state(&state)?)
            .await
            .map(Some),
        Command::Update {
            type_name,
            prior,
            planned,
        } => provider
            .update(&config, &type_name, parse_state(&prior)?, parse_state(&planned)?)
            .await
            .map(Some),
        Command::Delete { type_name, state } => provider
            .delete(&config, &type_name, parse_state(&state)?)
            .await
            .map(|_| None),
    };

    match outcome {
        Ok(Some(data)) => {
            print_state(&data)?;
            Ok(Ok(()))
        }
        Ok(None) => Ok(Ok(())),
        Err(e) => Ok(Err(e)),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    match run(args).await? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("{}", serde_json::to_string_pretty(&err.to_diagnostic())?);
            Ok(ExitCode::FAILURE)
        }
    }
}
