mod args;
mod batch;
mod display;

use std::collections::HashMap;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vbatch::encoder::{detect_version, resolve_encoder};
use vbatch::{Scheduler, SchedulerConfig};

use crate::args::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(failed) if failed > 0 => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            error!("{e:#}");
            process::exit(1);
        }
    }
}

/// Run the batch; returns the number of failed tasks.
async fn run(args: Args) -> anyhow::Result<usize> {
    let encoder = args.encoder.clone().unwrap_or_else(resolve_encoder);
    match detect_version(&encoder) {
        Some(version) => info!("encoder: {version}"),
        None => warn!(
            "could not run {}; tasks will fail if it is missing",
            encoder.display()
        ),
    }

    let tasks = batch::expand_tasks(&args)?;
    info!("starting {} transcode task(s)", tasks.len());

    let config = SchedulerConfig {
        max_concurrency: args.jobs,
        ..Default::default()
    };
    let (handle, events) = Scheduler::start(encoder, config)?;

    let labels: HashMap<_, _> = tasks
        .iter()
        .map(|t| {
            (
                t.id,
                t.output
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| t.id.to_string()),
            )
        })
        .collect();

    for task in tasks {
        handle.submit(task).await?;
    }

    // Ctrl-c cancels the whole pool; render_events then drains the
    // resulting terminal states and returns.
    let cancel_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling all tasks");
            let _ = cancel_handle.cancel_all().await;
        }
    });

    let summary = display::render_events(events, labels).await;
    handle.shutdown().await?;

    info!(
        "batch finished: {} completed, {} failed, {} cancelled",
        summary.completed, summary.failed, summary.cancelled
    );
    Ok(summary.failed)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
