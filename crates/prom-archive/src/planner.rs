use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

/// Ordered chunk start timestamps covering one retention window, oldest
/// first. The last start equals the window end, so a range query evaluated
/// there covers the final chunk.
pub fn chunk_starts(window_end: i64, chunk_secs: i64, range_secs: i64) -> Result<Vec<i64>> {
    if chunk_secs <= 0 || range_secs <= 0 {
        return Err(Error::config(format!(
            "chunk ({chunk_secs}s) and range ({range_secs}s) must be positive"
        )));
    }
    if range_secs % chunk_secs != 0 {
        return Err(Error::config(format!(
            "range {range_secs}s is not a whole number of {chunk_secs}s chunks"
        )));
    }
    let num_chunks = range_secs / chunk_secs;
    let first = window_end - range_secs + chunk_secs;
    Ok((0..num_chunks).map(|i| first + i * chunk_secs).collect())
}

/// How many retention windows make up the requested history.
pub fn parts_per_day(total_secs: i64, range_secs: i64) -> Result<i64> {
    if range_secs <= 0 {
        return Err(Error::config(format!(
            "stored data range must be positive, got {range_secs}s"
        )));
    }
    if total_secs % range_secs != 0 {
        return Err(Error::config(format!(
            "{total_secs}s of history does not divide into {range_secs}s parts"
        )));
    }
    Ok(total_secs / range_secs)
}

/// End timestamp of the part-th retention window, stepping backward from the
/// run's end time. Recomputed per part rather than mutated in place.
pub fn window_end(end_time: DateTime<Utc>, range_secs: i64, part: i64) -> DateTime<Utc> {
    end_time - Duration::seconds(part * range_secs)
}
