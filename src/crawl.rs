use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::signal;
use tracing::{error, info, warn};

use crawler_core::{AppConfig, CrawlError};
use crawler_downloader::Downloader;
use crawler_frontier::Frontier;
use crawler_parser::{extract_next_links, ReportSink};
use crawler_registration::register;

use crate::seeds::DEFAULT_SEEDS;

/// Runs the crawl to quiescence (or until Ctrl-C), then flushes state and
/// writes the diagnostic reports.
///
/// Each worker is a spawned task running the same loop: block on the
/// frontier for a ready URL, fetch it, run the response through the content
/// pipeline, feed any discovered links back in, and mark the URL complete.
/// The frontier's blocking `get_tbd_url` is the only politeness and
/// termination mechanism workers rely on; there is no separate idle-polling
/// loop here.
pub async fn run_crawl(config: AppConfig, restart: bool) -> Result<()> {
    let seed_urls: Vec<String> = if config.crawler.seed_urls.is_empty() {
        DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect()
    } else {
        config.crawler.seed_urls.clone()
    };

    let save_file = PathBuf::from(&config.local.save_file);
    let fresh = restart || !save_file.exists();

    let (cache_host, cache_port) = match register(
        &config.connection.host,
        config.connection.port,
        &config.connection.user_agent,
        fresh,
    )
    .await
    {
        Ok(endpoint) => endpoint,
        // A rejection is unrecoverable: abort before any worker is spawned.
        Err(CrawlError::Rejected(user_agent)) => {
            bail!("registration service rejected user agent '{user_agent}', aborting startup");
        }
        Err(e) => {
            warn!(error = %e, "registration service unreachable, falling back to configured cache server");
            (config.connection.host.clone(), config.connection.port)
        }
    };

    let politeness_delay = Duration::from_secs_f64(config.crawler.time_delay);

    let frontier = Arc::new(
        Frontier::open(
            &save_file,
            restart,
            &seed_urls,
            config.crawler.allowed_host_suffixes.clone(),
            politeness_delay,
        )
        .await?,
    );

    let downloader = Arc::new(Downloader::new(
        cache_host,
        cache_port,
        config.connection.user_agent.clone(),
        politeness_delay,
    )?);

    let reports = Arc::new(ReportSink::new());

    let shutdown_frontier = Arc::clone(&frontier);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, closing frontier");
            shutdown_frontier.close().await;
        }
    });

    info!(workers = config.local.threads_count, "spawning crawl workers");
    let mut worker_handles = Vec::with_capacity(config.local.threads_count);
    for worker_id in 0..config.local.threads_count {
        let frontier = Arc::clone(&frontier);
        let downloader = Arc::clone(&downloader);
        let reports = Arc::clone(&reports);

        worker_handles.push(tokio::spawn(async move {
            worker_loop(worker_id, frontier, downloader, reports).await;
        }));
    }

    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!(error = %e, "worker task panicked");
        }
    }

    frontier.close().await;

    if let Err(e) = reports.write_reports(&PathBuf::from("reports")) {
        warn!(error = %e, "failed to write diagnostic reports");
    }

    info!("crawl finished");
    Ok(())
}

async fn worker_loop(
    worker_id: usize,
    frontier: Arc<Frontier>,
    downloader: Arc<Downloader>,
    reports: Arc<ReportSink>,
) {
    loop {
        let Some(url) = frontier.get_tbd_url().await else {
            info!(worker_id, "frontier closed, worker exiting");
            return;
        };

        info!(worker_id, url = %url, "fetching");
        let response = downloader.download(&url).await;

        let links = extract_next_links(&url, response.as_ref(), Some(&reports));
        for link in &links {
            frontier.add_url(link).await;
        }

        frontier.mark_url_complete(&url).await;
        frontier.close_if_done().await;
    }
}
