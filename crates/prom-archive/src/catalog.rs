use std::fmt;

use crate::error::{Error, Result};

const SPANS: &[(&str, i64)] = &[
    ("1m", 60),
    ("30m", 1_800),
    ("1h", 3_600),
    ("3h", 10_800),
    ("6h", 21_600),
    ("12h", 43_200),
    ("1d", 86_400),
];

/// A duration drawn from the catalog, usable both as a query range selector
/// label and as a second count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    label: &'static str,
    seconds: i64,
}

impl Span {
    pub fn parse(label: &str) -> Result<Self> {
        let wanted = label.trim();
        SPANS
            .iter()
            .find(|(l, _)| *l == wanted)
            .map(|&(label, seconds)| Self { label, seconds })
            .ok_or_else(|| Error::config(format!("unknown duration label '{wanted}'")))
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

pub fn seconds_of(label: &str) -> Option<i64> {
    let wanted = label.trim();
    SPANS.iter().find(|(l, _)| *l == wanted).map(|&(_, s)| s)
}

pub fn label_of(seconds: i64) -> Option<&'static str> {
    SPANS.iter().find(|(_, s)| *s == seconds).map(|&(l, _)| l)
}

pub fn is_valid(label: &str) -> bool {
    seconds_of(label).is_some()
}

/// Checked once at configuration time, before any network activity.
pub fn validate_chunking(chunk: Span, range: Span) -> Result<()> {
    if chunk.seconds() > range.seconds() {
        return Err(Error::config(format!(
            "chunk size {chunk} cannot be bigger than stored data range {range}"
        )));
    }
    Ok(())
}
