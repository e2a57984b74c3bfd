//! mysql-backup CLI - logical MySQL/MariaDB backups.

use clap::{Parser, Subcommand};
use mysql_backup::{
    BackupError, BackupRunner, BackupSummary, Config, MysqlSource, ObjectFilter, SchemaSource,
    SectionSelection,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mysql-backup")]
#[command(about = "Logical MySQL/MariaDB backups as replayable SQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides shared by the dump commands.
#[derive(clap::Args)]
struct DumpArgs {
    /// Tables and views to include, e.g. "wp_*,log" (default: all)
    #[arg(long)]
    tables: Option<String>,

    /// Sections to write, e.g. "TABLES,DATA" (default: all)
    #[arg(long)]
    show: Option<String>,

    /// Rows per INSERT statement
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a backup file
    Run {
        #[command(flatten)]
        dump: DumpArgs,

        /// Destination folder (default: system temp directory)
        #[arg(long)]
        folder: Option<PathBuf>,
    },

    /// Write the backup to stdout
    Print {
        #[command(flatten)]
        dump: DumpArgs,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), BackupError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(BackupError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { dump, folder } => {
            apply_overrides(&mut config, &dump)?;
            if let Some(folder) = folder {
                config.backup.folder = Some(folder);
            }

            let runner = BackupRunner::connect(config).await?;
            let result = runner.run_to_file().await;
            runner.close().await;
            let summary = result?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Print { dump } => {
            apply_overrides(&mut config, &dump)?;

            let runner = BackupRunner::connect(config).await?;
            let result = runner.run_to_stdout().await;
            runner.close().await;
            let summary = result?;

            // stdout carries the dump; the summary goes to stderr
            if cli.output_json {
                eprintln!("{}", summary.to_json()?);
            }
        }

        Commands::HealthCheck => {
            let started = Instant::now();
            let source = MysqlSource::connect(&config.connection).await?;
            let checked = source.test_connection().await;
            source.close().await;
            checked?;
            let latency_ms = started.elapsed().as_millis();

            if cli.output_json {
                let result = serde_json::json!({
                    "database": config.connection.database,
                    "connected": true,
                    "latency_ms": latency_ms,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  {}: OK ({}ms)",
                    config.connection.display_url(),
                    latency_ms
                );
            }
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &DumpArgs) -> Result<(), BackupError> {
    if let Some(ref tables) = args.tables {
        config.tables = ObjectFilter::parse(tables);
    }
    if let Some(ref show) = args.show {
        config.backup.show = SectionSelection::parse(show)?;
    }
    if let Some(batch_size) = args.batch_size {
        config.backup.batch_size = batch_size;
    }
    config.validate()
}

fn print_summary(summary: &BackupSummary) {
    println!("\nBackup completed!");
    if let Some(ref path) = summary.output_path {
        println!("  File: {}", path.display());
    }
    println!("  Database: {}", summary.database);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!(
        "  Tables: {}  Views: {}  Procedures: {}  Functions: {}",
        summary.tables, summary.views, summary.procedures, summary.functions
    );
    println!("  Foreign keys: {}", summary.foreign_keys);
    println!(
        "  Rows: {} in {} INSERT statements",
        summary.rows, summary.insert_statements
    );
    println!("  Bytes: {}", summary.bytes_written);
}

/// Logs go to stderr so `print` can stream the dump on stdout.
fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}
