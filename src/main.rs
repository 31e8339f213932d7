mod checker;
mod config;
mod metrics;
mod prober;
mod report;
mod scheduler;
mod sites;
mod timestamp;
mod util;

use checker::SiteChecker;
use config::ProbeConfig;
use prober::{ProbeKind, Prober};
use prober::http::InstrumentedTransport;
use prober::tcp_connect::TcpProber;
use report::Report;
use scheduler::Heartbeat;

use anyhow::Context;
use tracing::{info, error};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config first to get log level
    let config = ProbeConfig::load().await?;
    let log_level = config.get_tracing_level()?;

    // Init tracing with configured log level
    let directive = format!("site_latency={}", log_level.as_str().to_lowercase());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    // An unreadable host list ends the run before anything is probed
    let template = config.endpoint_template();
    let endpoints = sites::read_endpoints(&config.sites_file, &template).await?;
    info!(
        "Probing {} endpoints from {} ({})",
        endpoints.len(),
        config.sites_file,
        config.kind.as_str()
    );

    let heartbeat = Heartbeat::spawn(config.heartbeat_interval_ms)?;

    let report = match config.kind {
        ProbeKind::Http => {
            let transport = InstrumentedTransport::from_config(&config)
                .context("building HTTP client")?;
            run_batch(transport, &endpoints).await
        }
        ProbeKind::TcpConnect => run_batch(TcpProber::new(config.tcp_timeout_ms), &endpoints).await,
    };

    if let Err(e) = heartbeat.stop().await {
        error!("heartbeat task failed: {:?}", e);
    }

    if report.is_empty() {
        anyhow::bail!("no endpoint was probed");
    }
    println!("{}", report);
    let summary = report.summary();
    info!(
        "{} of {} available, {} unavailable (min {:?}, max {:?})",
        summary.available, report.len(), summary.unavailable, summary.minimum, summary.maximum
    );

    metrics::observe_report(&report);
    if let Some(path) = &config.metrics_textfile {
        metrics::write_textfile(path).await?;
        info!("Metrics written to {}", path);
    }

    Ok(())
}

async fn run_batch<P: Prober>(prober: P, endpoints: &[String]) -> Report {
    SiteChecker::new(prober).check(endpoints).await
}
