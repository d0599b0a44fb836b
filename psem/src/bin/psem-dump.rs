//! Decode the manufacturing tables of a captured PSEM session

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info};
use psem::TimeFormat;
use psem::session::{CaptureSession, TableSession};
use psem::tables::tables::catalog;
use psem::tables::{LayoutContext, TableConfig, TableRecord, TableSpec};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON capture document
    capture: PathBuf,

    /// Decode timestamps as LTIME regardless of the capture
    #[arg(long)]
    local_time: bool,

    /// Override the device class recorded in the capture
    #[arg(long)]
    device_class: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the captured tables
    #[command(alias = "ls")]
    List,
    /// Decode catalog tables (all captured ones by default)
    Dump {
        /// Table ids to decode
        #[arg(short, long = "table")]
        tables: Vec<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let default_filter = std::env::var("PSEM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let cli = Cli::parse();
    let mut session = CaptureSession::load(&cli.capture)
        .await
        .with_context(|| format!("loading {}", cli.capture.display()))?;

    let mut ctx = LayoutContext::from_settings(session.settings());
    if cli.local_time {
        ctx.time_format = TimeFormat::LocalTime;
    }
    if let Some(device_class) = cli.device_class {
        ctx.device_class = device_class;
    }
    info!(
        "Decoding with {:?} timestamps, device class '{}'",
        ctx.time_format, ctx.device_class
    );

    match cli.command.unwrap_or(Command::Dump { tables: Vec::new() }) {
        Command::List => list(&session, &ctx),
        Command::Dump { tables } => dump(&mut session, &ctx, &tables).await,
    }
}

fn list(session: &CaptureSession, ctx: &LayoutContext) -> Result<()> {
    let specs = catalog(ctx);
    for id in session.table_ids() {
        let name = specs
            .iter()
            .find(|spec| spec.id == id)
            .map_or("unknown", |spec| spec.name);
        println!("{:>5}  {}", id.value(), name);
    }
    Ok(())
}

async fn dump(session: &mut CaptureSession, ctx: &LayoutContext, ids: &[u16]) -> Result<()> {
    let specs: Vec<TableSpec> = catalog(ctx)
        .into_iter()
        .filter(|spec| {
            if ids.is_empty() {
                session.contains(spec.id)
            } else {
                ids.contains(&spec.id.value())
            }
        })
        .collect();
    if specs.is_empty() {
        bail!("no catalog table to decode");
    }

    let mut failures = 0;
    for spec in specs {
        let mut table = TableRecord::new(spec, TableConfig::default());
        match table.read(session).await {
            Ok(()) => print_table(&table),
            Err(e) => {
                error!("Table {} ({}): {}", table.id(), table.name(), e);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{} tables could not be decoded", failures);
    }
    Ok(())
}

fn print_table(table: &TableRecord) {
    println!("{} {} ({} bytes)", table.id(), table.name(), table.len());
    for field in table.spec().header.fields() {
        if let Ok(value) = table.cached_value(field.name) {
            println!("  {:<24} {}", field.name, value);
        }
    }
    for record in table.cached_records().unwrap_or_default() {
        let values: Vec<String> = record
            .values()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        println!("  [{:>3}] {}", record.index(), values.join(" "));
    }
}
