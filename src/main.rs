mod collate;
mod config;
mod diff;
mod error;
mod fetch;
mod menu;
mod notify;
mod parser;
mod run;
mod schedule;
mod store;

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::{Overrides, Settings};
use crate::fetch::{FetchMode, Fetcher};
use crate::menu::Snapshot;
use crate::notify::dispatch::Dispatcher;
use crate::run::{NotifyOutcome, Pipeline, RunReport};
use crate::schedule::{Scheduler, SystemClock};
use crate::store::SnapshotStore;

#[derive(Parser)]
#[command(name = "menu_watch", about = "Watch an online ordering menu and push a notification when it changes")]
struct Cli {
    /// Menu page to watch
    #[arg(long, global = true)]
    url: Option<String>,
    /// Snapshot file (JSON)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
    /// How to fetch the page
    #[arg(long, global = true, value_enum)]
    fetch_mode: Option<FetchMode>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the menu once and exit
    Run,
    /// Check the menu every day at the configured time
    Watch,
    /// Extract and print the menu from a saved HTML page (no network, no writes)
    Check {
        /// Path to the HTML file
        #[arg(long)]
        html: PathBuf,
    },
    /// Print the stored snapshot
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(&Overrides {
        page_url: cli.url,
        data_file: cli.data_file,
        fetch_mode: cli.fetch_mode,
    })
    .context("loading configuration")?;

    let result = match cli.command {
        Commands::Run => {
            let app = App::new(&settings)?;
            match until_shutdown(app.pipeline(&settings).run_once()).await {
                Some(report) => {
                    print_report(&report?);
                    Ok(())
                }
                None => {
                    info!("shutdown signal received, run abandoned");
                    return Ok(());
                }
            }
        }
        Commands::Watch => {
            let app = App::new(&settings)?;
            let pipeline = app.pipeline(&settings);
            let pipeline = &pipeline;
            let mut scheduler = Scheduler::new(SystemClock, settings.trigger()?);

            info!(url = %settings.page_url, run_at = %settings.run_at, "watching menu");
            if until_shutdown(scheduler.run(move || pipeline.run_once(), None))
                .await
                .is_none()
            {
                info!("shutdown signal received, exiting");
            }
            return Ok(());
        }
        Commands::Check { html } => {
            let content = std::fs::read_to_string(&html)
                .with_context(|| format!("reading {}", html.display()))?;
            let state = parser::extract_state(&content)?;
            let snapshot = menu::project(&state, &settings.projection());
            print_snapshot(&snapshot);
            Ok(())
        }
        Commands::Show => {
            let store = SnapshotStore::new(&settings.data_file);
            let snapshot = store.load()?;
            if snapshot.is_empty() {
                println!("No snapshot at {}. Run 'run' first.", store.path().display());
                return Ok(());
            }
            print_snapshot(&snapshot);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Long-lived collaborators for `run` and `watch`.
struct App {
    fetcher: Fetcher,
    dispatcher: Dispatcher,
    store: SnapshotStore,
    projection: menu::Projection,
}

impl App {
    fn new(settings: &Settings) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(
            settings.fetch_mode,
            settings.spider_api_key.clone(),
            settings.timeout(),
        )?;
        let dispatcher = Dispatcher::new(settings.dispatch_config())?;
        if !dispatcher.is_configured() {
            warn!("HA_URL/HA_TOKEN not set, notifications will only be logged");
        }
        Ok(Self {
            fetcher,
            dispatcher,
            store: SnapshotStore::new(&settings.data_file),
            projection: settings.projection(),
        })
    }

    fn pipeline<'a>(&'a self, settings: &'a Settings) -> Pipeline<'a, Fetcher, Dispatcher> {
        Pipeline {
            fetcher: &self.fetcher,
            notifier: &self.dispatcher,
            store: &self.store,
            page_url: &settings.page_url,
            projection: &self.projection,
        }
    }
}

/// Drive `work` to completion unless SIGINT/SIGTERM arrives first, in which
/// case `work` is dropped and `None` returned.
async fn until_shutdown<T>(work: impl Future<Output = T>) -> Option<T> {
    race_shutdown(work, shutdown_signal()).await
}

async fn race_shutdown<T>(work: impl Future<Output = T>, shutdown: impl Future<Output = ()>) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        _ = shutdown => None,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn print_report(report: &RunReport) {
    println!("{} items on the menu", report.items);
    if report.diff.is_empty() {
        println!("No changes.");
        return;
    }
    for item in &report.diff.added {
        println!("  + {}", item.name);
    }
    for item in &report.diff.removed {
        println!("  - {}", item.name);
    }
    match &report.notified {
        NotifyOutcome::Delivered => println!("Notification sent."),
        NotifyOutcome::Degraded => println!("Notification logged (transport not configured)."),
        NotifyOutcome::Failed(e) => println!("Notification failed: {}", e),
        NotifyOutcome::Skipped => {}
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    if snapshot.is_empty() {
        println!("No items found.");
        return;
    }

    println!("{:>3} | {:<28} | {:<5} | {:<40}", "#", "Item", "Image", "Description");
    println!("{}", "-".repeat(84));

    for (i, item) in snapshot.iter().enumerate() {
        let image = if item.image_url.is_some() { "yes" } else { "-" };
        let description = item.description.as_deref().unwrap_or("-");
        println!(
            "{:>3} | {:<28} | {:<5} | {:<40}",
            i + 1,
            truncate(&item.name, 28),
            image,
            truncate(description, 40)
        );
    }

    println!("\n{} items", snapshot.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_abandons_in_flight_work() {
        let work = async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "finished"
        };
        assert_eq!(race_shutdown(work, async {}).await, None);
    }

    #[tokio::test]
    async fn work_finishing_first_is_returned() {
        let out = race_shutdown(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(out, Some(7));
    }

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
