use anyhow::{Context, Result};
use clap::Parser;
use jarmscan::cli::Args;
use jarmscan::jarm::Jarm;
use jarmscan::logging::init_logging;
use jarmscan::output::{print_error, Consolidator};
use jarmscan::scanner::{run_scan, ProbeExecutor, ProxyConfig};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_config());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = args.load_settings().context("failed to load settings")?;
    let proxy = ProxyConfig::from_env()?;
    let config = args.scan_config(&settings, proxy)?;
    debug!(
        ports = %config.ports,
        workers = config.workers,
        retries = config.retries,
        backoff = %config.backoff,
        output = %config.output,
        proxy = config.proxy.as_ref().map(|p| p.addr()),
        "starting scan"
    );

    let prober = Arc::new(ProbeExecutor::from_config(Jarm, &config));
    let consolidator = Consolidator::new(config.output, io::stdout());

    run_scan(prober, &config, args.targets, consolidator)
        .await
        .context("scan failed")?;
    Ok(())
}
