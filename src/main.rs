//! Subtitler - Burn English Subtitles Into Videos
//!
//! This is the main entry point: it parses the command line, sets up
//! logging, loads the configuration and runs one subtitling job.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subtitler::cli::Args;
use subtitler::config::Config;
use subtitler::error::SubtitlerError;
use subtitler::observer::{PipelineObserver, ProgressObserver, TracingObserver};
use subtitler::workflow::Workflow;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments (exits on --help, --version and usage errors)
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<SubtitlerError>()
                .map(SubtitlerError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to write configuration to {}", path.display()))?;
        println!("{}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    // Keep the file writer guard alive until the job is over
    let _guard = setup_logging(args.verbose, config.logging.log_dir.as_deref())?;

    info!("Starting subtitler v{}", env!("CARGO_PKG_VERSION"));

    let job = args
        .to_job()
        .context("A video file is required unless --write-config is given")?;
    info!("Processing video file: {}", job.input.display());

    let observer: Arc<dyn PipelineObserver> = if !args.verbose && std::io::stderr().is_terminal() {
        Arc::new(ProgressObserver::new())
    } else {
        Arc::new(TracingObserver)
    };

    let workflow = Workflow::new(config).with_observer(observer);

    // Failures were already reported by the observer, with the failing stage
    match workflow.run(&job).await {
        Ok(output) => {
            println!("{}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(ExitCode::from(e.exit_code())),
    }
}

/// Setup logging to the console, and to daily rolling files when a log directory is configured
fn setup_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr; stdout only carries the output path
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let (writer, guard) = non_blocking(rolling::daily(dir, "subtitler.log"));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false); // No ANSI colors in file

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if let Some(dir) = log_dir {
        info!("Logging to {}", dir.join("subtitler.log").display());
    }

    Ok(guard)
}
