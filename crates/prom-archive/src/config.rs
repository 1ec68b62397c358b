use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::catalog::{self, Span};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub host: String,
    pub token: Option<String>,
    pub end_time: DateTime<Utc>,
    pub chunk: Span,
    pub range: Span,
    pub replace: bool,
    pub backup_all: bool,
}

impl RunConfig {
    pub fn resolve(
        url: &str,
        token: Option<String>,
        day: Option<&str>,
        chunk_label: &str,
        range_label: &str,
        replace: bool,
        backup_all: bool,
    ) -> Result<Self> {
        let chunk = Span::parse(chunk_label)?;
        let range = Span::parse(range_label)?;
        catalog::validate_chunking(chunk, range)?;
        let url = url.trim().trim_end_matches('/').to_string();
        let host = host_of(&url)?;
        let end_time = parse_end_time(day)?;
        Ok(Self {
            url,
            host,
            token,
            end_time,
            chunk,
            range,
            replace,
            backup_all,
        })
    }
}

pub fn resolve_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Environment variable wins over the flag value when set.
pub fn env_or(key: &str, fallback: Option<String>) -> Option<String> {
    resolve_env(key).or(fallback)
}

pub fn env_flag(key: &str, fallback: bool) -> bool {
    match resolve_env(key) {
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"),
        None => fallback,
    }
}

pub fn require_env(key: &str) -> Result<String> {
    resolve_env(key).ok_or_else(|| Error::config(format!("environment variable '{key}' is not set")))
}

/// Authority part of the upstream URL, used as the leading archive key
/// segment.
pub fn host_of(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::config(format!("invalid upstream url '{url}': {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::config(format!("upstream url '{url}' has no host")))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// `YYYYMMDD` becomes that day at 23:59:59 UTC; anything else is taken as
/// epoch seconds; absent means the previous day.
pub fn parse_end_time(day: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(raw) = day.map(str::trim).filter(|s| !s.is_empty()) else {
        let yesterday = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| Error::config("cannot compute previous day"))?;
        return end_of_day(yesterday);
    };
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map_err(|e| Error::config(format!("invalid day '{raw}': {e}")))?;
        return end_of_day(date);
    }
    let secs: i64 = raw
        .parse()
        .map_err(|_| Error::config(format!("invalid day '{raw}': expected YYYYMMDD or epoch seconds")))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::config(format!("timestamp {secs} is out of range")))
}

fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| Error::config(format!("cannot build end of day for {date}")))
}
