use std::collections::BTreeSet;

use chrono::NaiveDate;
use prom_archive::planner;
use prom_archive::store;

fn example_end() -> chrono::DateTime<chrono::Utc> {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .expect("date")
        .and_hms_opt(23, 59, 59)
        .expect("time")
        .and_utc()
}

#[test]
fn identical_inputs_yield_identical_keys() {
    let a = store::object_key("prom.example.com", "up", example_end());
    let b = store::object_key("prom.example.com", "up", example_end());
    assert_eq!(a, b);
}

#[test]
fn key_format_is_host_metric_day_minute() {
    let key = store::object_key("prom.example.com:9090", "up", example_end());
    assert_eq!(key, "prom.example.com:9090/up/20240102/202401022359.json.bz2");
}

#[test]
fn each_window_of_the_day_gets_its_own_key() {
    let end = example_end();
    let keys: BTreeSet<String> = (0..4)
        .map(|part| {
            let window_end = planner::window_end(end, 21_600, part);
            store::object_key("prom.example.com", "up", window_end)
        })
        .collect();
    assert_eq!(keys.len(), 4);
    assert!(keys.iter().all(|k| k.contains("/20240102/")));
}

#[test]
fn payload_compression_emits_a_bzip2_stream() {
    let compressed = store::compress_payload(b"[{\"metric\":{}}]").expect("compress");
    assert!(compressed.starts_with(b"BZh"), "missing bzip2 magic");
}
