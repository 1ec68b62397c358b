use prom_archive::Error;
use prom_archive::catalog::{self, Span};
use prom_archive::config::{self, RunConfig};

#[test]
fn catalog_maps_labels_to_seconds() {
    let expected = [
        ("1m", 60),
        ("30m", 1_800),
        ("1h", 3_600),
        ("3h", 10_800),
        ("6h", 21_600),
        ("12h", 43_200),
        ("1d", 86_400),
    ];
    for (label, seconds) in expected {
        assert_eq!(catalog::seconds_of(label), Some(seconds), "label {label}");
        assert_eq!(catalog::label_of(seconds), Some(label), "seconds {seconds}");
        assert!(catalog::is_valid(label));
        let span = Span::parse(label).expect("parse label");
        assert_eq!(span.label(), label);
        assert_eq!(span.seconds(), seconds);
    }
}

#[test]
fn unknown_labels_are_rejected() {
    assert!(!catalog::is_valid("2h"));
    assert_eq!(catalog::seconds_of("2h"), None);
    assert_eq!(catalog::label_of(61), None);
    let err = Span::parse("2h").expect_err("unknown label");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn chunk_must_not_exceed_range() {
    let chunk = Span::parse("1h").expect("chunk");
    let range = Span::parse("6h").expect("range");
    catalog::validate_chunking(chunk, range).expect("smaller chunk is fine");
    catalog::validate_chunking(range, range).expect("equal spans are fine");

    let err = catalog::validate_chunking(range, chunk).expect_err("oversized chunk");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn run_config_rejects_oversized_chunk() {
    let err = RunConfig::resolve(
        "https://prom.example.com",
        None,
        Some("20240102"),
        "6h",
        "1h",
        false,
        false,
    )
    .expect_err("chunk bigger than range");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn run_config_resolves_host_and_end_time() {
    let cfg = RunConfig::resolve(
        "https://prom.example.com:9090/",
        Some("sekrit".to_string()),
        Some("20240102"),
        "1h",
        "6h",
        true,
        false,
    )
    .expect("resolve");
    assert_eq!(cfg.host, "prom.example.com:9090");
    assert_eq!(cfg.url, "https://prom.example.com:9090");
    assert_eq!(
        cfg.end_time.format("%Y%m%d%H%M%S").to_string(),
        "20240102235959"
    );
    assert!(cfg.replace);
}

#[test]
fn end_time_accepts_day_or_epoch() {
    let from_day = config::parse_end_time(Some("20240102")).expect("day form");
    assert_eq!(from_day.timestamp(), 1_704_239_999);

    let from_epoch = config::parse_end_time(Some("1704239999")).expect("epoch form");
    assert_eq!(from_epoch, from_day);

    let err = config::parse_end_time(Some("yesterday-ish")).expect_err("garbage");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn host_includes_port_only_when_present() {
    assert_eq!(
        config::host_of("https://prom.example.com:9090/path").expect("with port"),
        "prom.example.com:9090"
    );
    assert_eq!(
        config::host_of("https://prom.example.com").expect("without port"),
        "prom.example.com"
    );
    let err = config::host_of("not a url").expect_err("invalid url");
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}
