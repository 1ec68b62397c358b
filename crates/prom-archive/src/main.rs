use clap::Parser;
use tracing::{info, warn};

use prom_archive::backup::{self, BackupJob};
use prom_archive::config::{self, RunConfig};
use prom_archive::store::S3CliStore;
use prom_archive::upstream::MetricFetcher;
use prom_archive::{Error, Result};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Day to back up, YYYYMMDD or epoch seconds (defaults to the previous day)
    #[arg(long)]
    day: Option<String>,
    /// URL of the Prometheus server (env: URL)
    #[arg(long)]
    url: Option<String>,
    /// Bearer token for the query API (env: BEARER_TOKEN)
    #[arg(long)]
    token: Option<String>,
    /// Back up every metric the server knows about (env: PROM_BACKUP_ALL)
    #[arg(long)]
    backup_all: bool,
    /// Print the server's metric names and exit
    #[arg(long)]
    list_metrics: bool,
    /// Size of the chunk downloaded per query
    #[arg(long, default_value = "1h")]
    chunk_size: String,
    /// Span of data stored per archive object; cannot be smaller than chunk-size
    #[arg(long, default_value = "3h")]
    stored_data_range: String,
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Replace already archived objects
    #[arg(long)]
    replace: bool,
    /// Metric names to back up, e.g. ALERTS - or --backup-all
    metric: Vec<String>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.debug);

    let url = config::env_or("URL", args.url.clone())
        .ok_or_else(|| Error::config("no server url configured; pass --url or set URL"))?;
    let token = config::env_or("BEARER_TOKEN", args.token.clone());
    let backup_all = config::env_flag("PROM_BACKUP_ALL", args.backup_all);

    let cfg = RunConfig::resolve(
        &url,
        token,
        args.day.as_deref(),
        &args.chunk_size,
        &args.stored_data_range,
        args.replace,
        backup_all,
    )?;

    let mut fetcher = MetricFetcher::new(&cfg.url, cfg.token.as_deref())?;

    if args.list_metrics {
        for name in fetcher.all_metrics()? {
            println!("{name}");
        }
        return Ok(());
    }

    let metrics: Vec<String> = if cfg.backup_all {
        fetcher.all_metrics()?.iter().cloned().collect()
    } else {
        args.metric.clone()
    };
    if metrics.is_empty() {
        return Err(Error::config(
            "no metrics requested; pass metric names or --backup-all",
        ));
    }

    let mut store = S3CliStore::from_env()?;
    let job = BackupJob {
        host: cfg.host.clone(),
        end_time: cfg.end_time,
        chunk: cfg.chunk,
        range: cfg.range,
        replace: cfg.replace,
    };
    let summary = backup::run(&job, &metrics, &mut fetcher, &mut store)?;

    let failed = summary.failures().count();
    info!(
        "done: {} windows archived, {} skipped, {} of {} metrics failed",
        summary.stored(),
        summary.skipped(),
        failed,
        metrics.len()
    );
    for report in summary.failures() {
        if let Some(err) = &report.error {
            warn!("{}: {}", report.metric, err);
        }
    }
    info!(
        "total connection errors after retries: {}",
        fetcher.connection_errors()
    );
    Ok(())
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
