mod catalog;
mod cli;
mod clock;
mod model;
mod notify;
mod runner;
mod sort;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr in batch modes. The TUI owns the terminal, so there they
/// go to `--log-file` or nowhere.
fn init_logging(args: &cli::Cli) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();

    if !args.is_interactive() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    if let Some(path) = args.log_file.as_deref() {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(&args)?;

    let is_non_tui = !args.is_interactive();
    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success so no stray task keeps the runtime alive.
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
