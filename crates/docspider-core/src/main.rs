//! CLI entry point for one crawl session.
//!
//! Grounded on the teacher's `riptide-workers::main` shape: `clap::Parser`
//! for process arguments, `tracing_subscriber` with `EnvFilter` for
//! structured logging, and a `tokio::select!` between the service's
//! natural completion and a Ctrl+C signal for graceful shutdown.

mod bus;
mod coordinator;
mod monitor;
mod pipeline;
mod stats;
mod worker;

use anyhow::{Context, Result};
use clap::Parser;
use docspider_config::crawl::CrawlConfig;
use docspider_config::env::apply_env_overrides;
use docspider_types::ports::bus::BusProducer;
use docspider_types::CrawlDirective;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::bus::InProcessBus;
use crate::coordinator::Coordinator;

#[derive(Parser)]
#[command(name = "docspider-crawl")]
#[command(about = "Documentation-oriented website crawler and work dispatcher")]
struct Args {
    #[arg(long)]
    request_id: u32,

    #[arg(long)]
    project_id: u32,

    #[arg(long)]
    user_id: String,

    #[arg(long)]
    collection_id: String,

    #[arg(long)]
    base_url: String,

    #[arg(long, default_value_t = CrawlDirective::default_max_pages())]
    max_pages: u32,

    #[arg(long, default_value_t = CrawlDirective::default_max_depth())]
    max_depth: u32,

    #[arg(long, default_value_t = 600)]
    max_crawl_duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();

    let directive = CrawlDirective {
        request_id: args.request_id,
        project_id: args.project_id,
        user_id: args.user_id,
        collection_id: args.collection_id,
        base_url: args.base_url,
        max_pages: args.max_pages,
        max_depth: args.max_depth,
        max_crawl_duration: Duration::from_secs(args.max_crawl_duration_secs),
    };

    let config = apply_env_overrides(CrawlConfig::default()).context("loading environment overrides")?
        .apply_directive_overrides(
            directive.max_pages as usize,
            directive.max_depth,
            directive.max_crawl_duration,
        );

    tracing::info!(
        request_id = directive.request_id,
        base_url = %directive.base_url,
        max_pages = directive.max_pages,
        max_depth = directive.max_depth,
        "in_progress"
    );

    let bus: Arc<dyn BusProducer> = Arc::new(InProcessBus::new());

    let mut coordinator = match Coordinator::start(directive.clone(), config, bus).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "failed");
            return Err(e.into());
        }
    };

    // The signal handler only needs a clone of the cancellation token, not
    // a reference to the coordinator itself, so it runs as its own task
    // instead of racing `coordinator.wait()` in a `select!` — that would
    // drop the wait future (and, with it, the only thing still observing
    // the worker/pipeline/monitor handles) the moment the signal branch
    // won, leaking every spawned task.
    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal, stopping crawl");
            cancel.cancel();
        }
    });

    let (reason, stats) = coordinator.wait().await;

    tracing::info!(
        request_id = directive.request_id,
        ?reason,
        total_jobs = stats.jobs_sent,
        crawled = stats.crawled,
        failed = stats.failed,
        filtered = stats.filtered,
        duration_s = stats.duration.as_secs_f64(),
        "crawl_complete"
    );

    Ok(())
}
