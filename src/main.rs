use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use booking_list_comparator::extract::{extract_text, numbered_lines};
use booking_list_comparator::report::REPORT_FILE_NAME;
use booking_list_comparator::server::{AppState, start_server};
use booking_list_comparator::{Config, SourceFile, compare_pdfs, write_xlsx};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "booking-list-comparator")]
#[command(about = "Compare two booking list PDFs dossier by dossier")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload page and report download (default)
    Serve {
        #[arg(long, env = "BOOKING_COMPARE_ADDR", default_value = "0.0.0.0:3000")]
        addr: String,
    },
    /// Compare two PDFs and write the spreadsheet report
    Compare {
        old: PathBuf,
        new: PathBuf,
        #[arg(short, long, default_value = REPORT_FILE_NAME)]
        output: PathBuf,
        /// Print the rows as JSON instead of writing a spreadsheet
        #[arg(long)]
        json: bool,
    },
    /// Print the numbered text lines extracted from a PDF
    Dump { pdf: PathBuf },
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn compare_files(config: &Config, old: &Path, new: &Path, output: &Path, json: bool) -> anyhow::Result<()> {
    let rules = config.rules()?;
    let old_bytes = read_file(old)?;
    let new_bytes = read_file(new)?;
    let old_name = old.display().to_string();
    let new_name = new.display().to_string();

    let comparison = compare_pdfs(
        SourceFile {
            name: &old_name,
            bytes: &old_bytes,
        },
        SourceFile {
            name: &new_name,
            bytes: &new_bytes,
        },
        &rules,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    let xlsx = write_xlsx(&comparison.entries, &config.report_options())?;
    fs::write(output, xlsx).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}", comparison.summary);
    println!("Report written to {}", output.display());
    Ok(())
}

fn dump(path: &Path) -> anyhow::Result<()> {
    let bytes = read_file(path)?;
    let text = extract_text(&path.display().to_string(), &bytes)?;
    for (i, line) in numbered_lines(&text) {
        println!("{}: {:?}", i, line);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_list_comparator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        addr: std::env::var("BOOKING_COMPARE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
    });

    match command {
        Command::Serve { addr } => {
            let state = AppState::new(cli.config)?;
            start_server(&addr, state).await?;
        }
        Command::Compare {
            old,
            new,
            output,
            json,
        } => {
            let config = cli.config;
            // Blocking PDF work on a dedicated thread, as the server does.
            tokio::task::spawn_blocking(move || compare_files(&config, &old, &new, &output, json)).await??;
        }
        Command::Dump { pdf } => dump(&pdf)?,
    }

    Ok(())
}
