//! Roster Identity command line
//!
//! Each subcommand is one invocation against the active workbook. Reports
//! are printed to stdout as JSON; progress goes to the log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use roster_identity::config::runtime::ENV_CONFIG_FILE;
use roster_identity::services::{FormAnswers, FormSubmission};
use roster_identity::utils::init_logging;
use roster_identity::{IdentityService, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "roster_identity", version)]
#[command(about = "Person ID resolution across roster spreadsheets")]
struct Cli {
    /// Active workbook (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    workbook: Option<PathBuf>,

    /// Runtime config file (YAML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Durable ID sequence database (SQLite)
    #[arg(long, global = true, value_name = "PATH")]
    sequence_db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the master index and rewrite stale directory IDs
    Rescan,
    /// Resolve or allocate the ID of one new member form row
    AssignRow {
        /// 1-based row of the new member form tab
        #[arg(long)]
        row: usize,
    },
    /// Process one new member form submission
    Intake {
        #[arg(long)]
        row: usize,
        /// JSON file with the form answers
        #[arg(long, value_name = "FILE")]
        answers: PathBuf,
    },
    /// Fill blank community-prefixed IDs in the directory
    Community,
    /// Create the configuration tab from the template
    InitConfig,
    /// Record the workbook URL in the configuration tab
    Initialize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = load_runtime(&cli).await?;
    info!("📂 Active workbook: {:?}", runtime.workbook);
    let service = IdentityService::new(runtime);

    match cli.command {
        Command::Rescan => print_report(&service.full_rescan().await?)?,
        Command::AssignRow { row } => print_report(&service.assign_single_row(row).await?)?,
        Command::Intake { row, answers: path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read answers from {:?}", path))?;
            let answers: FormAnswers =
                serde_json::from_str(&raw).with_context(|| format!("Invalid answers JSON in {:?}", path))?;
            let report = service.process_submission(&FormSubmission { row, answers }).await?;
            print_report(&report)?;
        }
        Command::Community => print_report(&service.assign_community_ids().await?)?,
        Command::InitConfig => {
            service.create_config().await?;
            println!("Created \"{}\". Fill in the URLs in column B, then run `initialize`.", service.runtime().config_tab);
        }
        Command::Initialize => {
            let settings = service.initialize().await?;
            print_report(&serde_json::json!({ "settings_in_effect": settings }))?;
        }
    }

    Ok(())
}

/// Defaults, then the YAML file, then environment, then flags.
async fn load_runtime(cli: &Cli) -> Result<RuntimeConfig> {
    let config_file = cli
        .config
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().filter(|v| !v.is_empty()).map(PathBuf::from));

    let mut runtime = match config_file {
        Some(path) => RuntimeConfig::from_yaml_file(&path)
            .await
            .with_context(|| format!("Failed to load runtime config {:?}", path))?,
        None => RuntimeConfig::default(),
    }
    .apply_env();

    if let Some(workbook) = &cli.workbook {
        runtime.workbook = workbook.clone();
    }
    if let Some(sequence_db) = &cli.sequence_db {
        runtime.sequence_db = Some(sequence_db.clone());
    }
    Ok(runtime)
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
