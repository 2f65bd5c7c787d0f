//! analyze-batch command line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use analyze_batch::services::{AnalysisRequest, AnalysisService};
use analyze_batch::storage::ConfigService;
use analyze_batch::SettingsUpdate;
use analyze_batch_core::{BatchEvent, MessageFormat, TaskSeverity};
use analyze_batch_scheduler::{BatchState, BatchSummary};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "analyze-batch")]
#[command(about = "Run clang-tidy and clazy over a compilation database")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the files of a compilation database
    Run {
        /// compile_commands.json or the directory containing it
        #[arg(long, short = 'p')]
        compile_commands: PathBuf,
        /// Maximum number of concurrent tool processes
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Configuration file (JSON or TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Only analyze these files
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Build directory, used to detect stale build output
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Per-file time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    ShowConfig {
        /// Configuration file (JSON or TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            compile_commands,
            jobs,
            config,
            files,
            build_dir,
            timeout,
            json,
        } => {
            let mut service = ConfigService::load(config.as_deref())
                .context("failed to load configuration")?;
            let config = service
                .apply_overrides(SettingsUpdate {
                    parallel_jobs: jobs,
                    build_before_analysis: None,
                    build_directory: build_dir,
                    timeout_secs: timeout,
                })
                .context("invalid settings")?
                .clone();

            let request = AnalysisRequest::new(compile_commands).with_files(files);
            let summary = run_batch(AnalysisService::new(config), request, json).await?;
            print_summary(&summary, json)?;

            if summary.state == BatchState::Finalized && summary.success {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::ShowConfig { config } => {
            let service = ConfigService::load(config.as_deref())
                .context("failed to load configuration")?;
            println!("# {}", service.config_path().display());
            println!("{}", serde_json::to_string_pretty(service.get_config())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_batch(
    service: AnalysisService,
    request: AnalysisRequest,
    json: bool,
) -> anyhow::Result<BatchSummary> {
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let printer = tokio::spawn(print_events(rx, json));

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping analysis");
            ctrl_c.cancel();
        }
    });

    let result = service.run(&request, tx, token).await;
    // The controller owned the last sender; the printer drains and exits.
    printer.await.context("event printer panicked")?;
    Ok(result?)
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<BatchEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Message { text, format } => match format {
                MessageFormat::Normal | MessageFormat::StdOut if !json => println!("{}", text),
                _ => eprintln!("{}", text),
            },
            BatchEvent::DiagnosticsAvailable { diagnostics, .. } => {
                for diagnostic in diagnostics {
                    if json {
                        eprintln!("{}", diagnostic);
                    } else {
                        println!("{}", diagnostic);
                    }
                }
            }
            BatchEvent::Task(task) => {
                let label = match task.severity {
                    TaskSeverity::Warning => "warning",
                    TaskSeverity::Error => "error",
                };
                eprintln!("{}: {}", label, task.message);
            }
            BatchEvent::Progress { value, maximum } => {
                tracing::debug!(value, maximum, "progress");
            }
            BatchEvent::UnitFailed { details, .. } if !details.is_empty() => {
                tracing::debug!(%details, "tool output");
            }
            _ => {}
        }
    }
}

fn print_summary(summary: &BatchSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    if summary.state == BatchState::Stopped {
        println!("{} stopped.", summary.tool_name);
    }
    for file in &summary.not_analyzed_files {
        println!("  not analyzed: {}", file);
    }
    println!(
        "{} analyzed, {} not analyzed, {} diagnostics in {} ms",
        summary.analyzed_files.len(),
        summary.not_analyzed_files.len(),
        summary.diagnostics_count,
        summary.duration_ms
    );
    if let Some(finished) = summary.finished_at {
        let local = finished.with_timezone(&chrono::Local);
        println!("Finished at {}", local.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
