use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::catalog::Span;
use crate::error::Result;
use crate::planner;
use crate::store::{self, ObjectStore};
use crate::upstream::MetricSource;

/// One run always partitions a single day of history into retention parts.
pub const DAY_SECONDS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct BackupJob {
    pub host: String,
    pub end_time: DateTime<Utc>,
    pub chunk: Span,
    pub range: Span,
    pub replace: bool,
}

#[derive(Debug)]
pub struct MetricReport {
    pub metric: String,
    pub stored: u32,
    pub skipped: u32,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<MetricReport>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &MetricReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }

    pub fn stored(&self) -> u32 {
        self.reports.iter().map(|r| r.stored).sum()
    }

    pub fn skipped(&self) -> u32 {
        self.reports.iter().map(|r| r.skipped).sum()
    }
}

/// Walk every requested metric through its retention parts. A failing metric
/// is reported and the run moves on; only configuration problems surface as
/// an error here.
pub fn run<S: MetricSource, O: ObjectStore>(
    job: &BackupJob,
    metrics: &[String],
    source: &mut S,
    store: &mut O,
) -> Result<RunSummary> {
    let parts = planner::parts_per_day(DAY_SECONDS, job.range.seconds())?;
    let mut summary = RunSummary::default();
    let total = metrics.len();
    for (i, metric) in metrics.iter().enumerate() {
        info!("{} of {}....... {}", i + 1, total, metric);
        match backup_metric(job, parts, metric, source, store) {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                warn!("error backing up {}: {}", metric, e);
                summary.reports.push(MetricReport {
                    metric: metric.clone(),
                    stored: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(summary)
}

fn backup_metric<S: MetricSource, O: ObjectStore>(
    job: &BackupJob,
    parts: i64,
    metric: &str,
    source: &mut S,
    store: &mut O,
) -> Result<MetricReport> {
    source.validate_metric(metric)?;

    let mut stored = 0;
    let mut skipped = 0;
    for part in 0..parts {
        let window_end = planner::window_end(job.end_time, job.range.seconds(), part);
        let key = store::object_key(&job.host, metric, window_end);

        if !job.replace && store.exists(&key)? {
            info!("part {}/{}... already archived", part + 1, parts);
            skipped += 1;
            continue;
        }

        let starts =
            planner::chunk_starts(window_end.timestamp(), job.chunk.seconds(), job.range.seconds())?;
        match source.fetch_window(metric, job.chunk, &starts)? {
            Some(payload) => {
                let key = store.put(&key, payload.as_bytes())?;
                info!("part {}/{}... archived as {}", part + 1, parts, key);
                stored += 1;
            }
            None => {
                warn!(
                    "part {}/{}... abandoned after retry exhaustion",
                    part + 1,
                    parts
                );
                return Ok(MetricReport {
                    metric: metric.to_string(),
                    stored,
                    skipped,
                    error: Some(format!("window ending {window_end} degraded after retries")),
                });
            }
        }
    }

    Ok(MetricReport {
        metric: metric.to_string(),
        stored,
        skipped,
        error: None,
    })
}
