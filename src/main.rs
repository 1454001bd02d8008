mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{Overrides, Settings};
use nftower::{OrgRole, TowerClient};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for Nextflow Tower
#[derive(Parser, Debug)]
#[command(name = "nftower", version, about, long_about = None)]
struct Args {
    /// Tower API endpoint
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Personal access token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Organization name
    #[arg(short, long, global = true)]
    organization: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List organizations visible to the token
    Orgs,
    /// List workspaces of the organization
    Workspaces,
    /// Show a compute environment
    ComputeEnv { workspace: String, id: String },
    /// Make sure labels exist and print their ids
    EnsureLabels {
        workspace: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Add a user to the organization with a role
    AddMember {
        email: String,
        #[arg(long, default_value = "member")]
        role: OrgRole,
    },
    /// Upload a file as a new dataset version
    UploadDataset {
        workspace: String,
        dataset: String,
        file: PathBuf,
        /// First row is a header
        #[arg(long)]
        header: bool,
    },
    /// Save the global flags to the config file
    Configure,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
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
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("nftower started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("nftower").join("nftower.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".nftower").join("nftower.log");
    }
    PathBuf::from("nftower.log")
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let overrides = Overrides {
        api_url: args.api_url.clone(),
        access_token: args.token.clone(),
        organization: args.organization.clone(),
    };

    if let Command::Configure = args.command {
        let settings = Settings::load().resolve(|_| None, overrides);
        settings.save().context("Failed to save configuration")?;
        if let Some(path) = Settings::config_path() {
            eprintln!("Saved configuration to {}", path.display());
        }
        return Ok(());
    }

    let settings = Settings::load().resolve(|key| std::env::var(key).ok(), overrides);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling in-flight request");
            ctrl_c.cancel();
        }
    });

    let client = settings
        .client_builder()?
        .cancellation(cancel)
        .connect()
        .await
        .context("Failed to connect to Tower")?;

    run(&client, args.command, args.output).await
}

async fn run(client: &TowerClient, command: Command, output: OutputFormat) -> Result<()> {
    match command {
        Command::Orgs => {
            let orgs = client.list_organizations().await.context("Failed to list organizations")?;
            print(output, &orgs)
        }
        Command::Workspaces => {
            let workspaces = client.list_workspaces().await.context("Failed to list workspaces")?;
            print(output, &workspaces)
        }
        Command::ComputeEnv { workspace, id } => {
            let workspace = client.get_workspace_by_name(&workspace).await?;
            let env = client
                .get_compute_env(workspace.id, &id)
                .await
                .with_context(|| format!("Failed to read compute environment {id}"))?;
            match env {
                Some(env) => {
                    let config = client.platforms().encode(&env.config)?;
                    let platform = env.platform();
                    print(
                        output,
                        &serde_json::json!({
                            "id": env.id,
                            "name": env.name,
                            "description": env.description,
                            "platform": platform,
                            "credentialsId": env.credentials_id,
                            "status": env.status,
                            "config": config,
                        }),
                    )
                }
                None => {
                    eprintln!("Compute environment {id} has been deleted");
                    Ok(())
                }
            }
        }
        Command::EnsureLabels { workspace, names } => {
            let workspace = client.get_workspace_by_name(&workspace).await?;
            let labels = client
                .ensure_labels(workspace.id, names.as_slice())
                .await
                .context("Failed to ensure labels")?;
            print(output, &labels)
        }
        Command::AddMember { email, role } => {
            let member = client
                .ensure_organization_member(&email, role)
                .await
                .with_context(|| format!("Failed to add {email}"))?;
            print(output, &member)
        }
        Command::UploadDataset {
            workspace,
            dataset,
            file,
            header,
        } => {
            let workspace = client.get_workspace_by_name(&workspace).await?;
            let dataset = client.get_dataset_by_name(workspace.id, &dataset).await?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid file name {}", file.display()))?
                .to_string();
            let source =
                File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?;
            let version = client
                .upload_dataset_version(workspace.id, &dataset.id, source, &file_name, header)
                .await
                .context("Failed to upload dataset")?;
            print(output, &version)
        }
        Command::Configure => Ok(()),
    }
}
