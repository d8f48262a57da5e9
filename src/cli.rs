use crate::clock::TokioClock;
use crate::model::{ActionKind, AppConfig, Notification, ViewKind};
use crate::notify::{ChannelSink, Tee, TracingSink};
use crate::runner::{ActionRun, SimulatedActionRunner};
use crate::sort::{SortDescriptor, SortDirection};
use crate::view::{default_descriptor, CatalogView};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DirectionArg {
    Asc,
    Desc,
}

impl From<DirectionArg> for SortDirection {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::Asc => SortDirection::Ascending,
            DirectionArg::Desc => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "device-prophecy",
    version,
    about = "Device failure prophecies with simulated remote actions"
)]
pub struct Cli {
    /// Which view to open
    #[arg(long, value_enum, default_value_t = ViewKind::Cards)]
    pub view: ViewKind,

    /// Field to sort by (defaults to the view's risk column)
    #[arg(long)]
    pub sort_field: Option<String>,

    /// Sort direction
    #[arg(long, value_enum, default_value_t = DirectionArg::Desc)]
    pub direction: DirectionArg,

    /// Simulated latency of launched actions
    #[arg(long, default_value = "2s")]
    pub latency: humantime::Duration,

    /// Seed for generated device names
    #[arg(long)]
    pub seed: Option<u64>,

    /// Launch an action and wait for its notification (text/JSON modes)
    #[arg(long, value_enum)]
    pub launch: Option<ActionKind>,

    /// Index into the sorted view that --launch targets
    #[arg(long, default_value_t = 0)]
    pub target: usize,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Write logs here while the TUI owns the terminal
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_batch(args, false).await;
        }
    }

    let json = args.json;
    run_batch(args, json).await
}

/// Build an `AppConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AppConfig {
    let sort = match args.sort_field.as_deref() {
        Some(field) => SortDescriptor::new(field, args.direction.into()),
        None => SortDescriptor::new(
            default_descriptor(args.view).field,
            args.direction.into(),
        ),
    };
    AppConfig {
        view: args.view,
        sort,
        simulated_latency: Duration::from(args.latency),
        seed: args.seed,
        launch: args.launch,
        target: args.target,
    }
}

#[derive(Serialize)]
struct BatchReport {
    config: AppConfig,
    items: serde_json::Value,
    run: Option<ActionRun>,
    notifications: Vec<Notification>,
}

/// Text and JSON modes: print the sorted view, optionally launching one action
/// and waiting for its outcome.
async fn run_batch(args: Cli, json: bool) -> Result<()> {
    let cfg = build_config(&args);
    let view = CatalogView::load(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();

    let mut notifications = Vec::new();
    let mut run = None;
    if let Some(kind) = cfg.launch {
        let request = view.action_for(cfg.target, kind, cfg.simulated_latency)?;
        let (clock, driver) = TokioClock::spawn();
        let (note_tx, mut note_rx) = mpsc::unbounded_channel::<Notification>();
        let runner = SimulatedActionRunner::new(
            Arc::new(clock),
            Arc::new(Tee(ChannelSink::new(note_tx), TracingSink)),
        );

        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Launching {} \"{}\"…",
            kind.label().to_lowercase(),
            request.action_id
        )));
        let handle = runner.start(request);
        let note = note_rx
            .recv()
            .await
            .context("action runner stopped before reporting")?;
        notifications.push(note);
        run = runner.run(handle);

        // Dropping the runner drops the clock, which stops the driver.
        drop(runner);
        let _ = driver.await;
    }

    if json {
        let report = BatchReport {
            config: cfg.clone(),
            items: view.to_json()?,
            run,
            notifications,
        };
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&report)?));
    } else {
        let summary = crate::text_summary::build_text_summary(&view, &cfg.sort, &notifications);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_defaults_follow_the_view() {
        let args = Cli::parse_from(["device-prophecy", "--view", "table", "--text"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.sort, SortDescriptor::descending("failureProbability"));
        assert_eq!(cfg.simulated_latency, Duration::from_secs(2));

        let args = Cli::parse_from(["device-prophecy", "--json"]);
        assert_eq!(build_config(&args).sort.field, "names.length");
    }

    #[test]
    fn explicit_sort_and_launch_are_parsed() {
        let args = Cli::parse_from([
            "device-prophecy",
            "--sort-field",
            "scriptName",
            "--direction",
            "asc",
            "--latency",
            "150ms",
            "--launch",
            "campaign",
            "--target",
            "2",
            "--json",
        ]);
        assert!(!args.is_interactive());
        let cfg = build_config(&args);
        assert_eq!(cfg.sort, SortDescriptor::ascending("scriptName"));
        assert_eq!(cfg.simulated_latency, Duration::from_millis(150));
        assert_eq!(cfg.launch, Some(ActionKind::Campaign));
        assert_eq!(cfg.target, 2);
    }
}
