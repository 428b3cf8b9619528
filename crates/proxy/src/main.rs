use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use micro_proxy::{Blocklist, Cli, ProxyConfig, ProxyContext, Server};
use micro_proxy_cache::Cache;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => {
            // --help and --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    let config = match ProxyConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("error: failed to install log subscriber: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "proxy failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), Box<dyn Error>> {
    info!(port = config.port, cache_ttl_secs = config.cache_ttl_secs, cache_dir = %config.cache_dir.display(), "starting proxy");
    if config.prefetch_depth > 0 {
        warn!(prefetch_depth = config.prefetch_depth, "link prefetching is not supported, ignoring prefetch depth");
    }

    let cache = Arc::new(Cache::new(config.cache_config())?);
    let blocklist = Blocklist::load(&config.blocklist).await?;
    info!(entries = blocklist.len(), "blocklist ready");

    let server = Server::new(ProxyContext::new(config, cache, blocklist));
    let listener = server.bind().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(cause = %e, "failed to listen for interrupt, shutting down");
        }
    };
    server.run(listener, shutdown).await?;
    Ok(())
}
