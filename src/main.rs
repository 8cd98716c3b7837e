mod cli;
mod crawl;
mod seeds;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Use mimalloc to prevent memory bloat under high worker-count concurrency.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use crawler_core::AppConfig;

use crate::cli::Cli;
use crate::crawl::run_crawl;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config_file).unwrap_or_else(|_| {
        warn!(path = %cli.config_file, "config file not found, using bundled default");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;

    if let Err(e) = run_crawl(config, cli.restart).await {
        eprintln!("crawl failed: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}
