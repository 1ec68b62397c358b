use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Output};

use chrono::{DateTime, Utc};

use crate::config;
use crate::error::{Error, Result};

pub const OBJECT_SUFFIX: &str = ".json.bz2";

/// Deterministic object key for one archived retention window. Same
/// (host, metric, window-end minute) always yields the same key; this is the
/// whole idempotency mechanism, there is no separate index.
pub fn object_key(host: &str, metric: &str, window_end: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/{}{}",
        host,
        metric,
        window_end.format("%Y%m%d"),
        window_end.format("%Y%m%d%H%M"),
        OBJECT_SUFFIX
    )
}

pub fn compress_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

/// Storage destination for archived windows. Duplicate `put` overwrites;
/// skip-if-exists lives in the orchestrator, not here.
pub trait ObjectStore {
    fn exists(&self, key: &str) -> Result<bool>;
    fn put(&mut self, key: &str, payload: &[u8]) -> Result<String>;
}

/// S3-compatible store driven through the `aws` CLI, credentials and
/// endpoint sourced from the environment.
#[derive(Debug, Clone)]
pub struct S3CliStore {
    bucket: String,
    endpoint: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl S3CliStore {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bucket: config::require_env("BOTO_OBJECT_STORE")?,
            endpoint: config::resolve_env("BOTO_STORE_ENDPOINT"),
            access_key: config::resolve_env("BOTO_ACCESS_KEY"),
            secret_key: config::resolve_env("BOTO_SECRET_KEY"),
        })
    }

    fn configure(&self, cmd: &mut Command) {
        if let Some(endpoint) = &self.endpoint {
            cmd.arg("--endpoint-url").arg(endpoint);
        }
        // Endpoint certificates are self-signed in the deployments this tool
        // targets; verification stays off.
        cmd.arg("--no-verify-ssl");
        if let Some(key) = &self.access_key {
            cmd.env("AWS_ACCESS_KEY_ID", key);
        }
        if let Some(key) = &self.secret_key {
            cmd.env("AWS_SECRET_ACCESS_KEY", key);
        }
    }
}

impl ObjectStore for S3CliStore {
    fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = Command::new("aws");
        self.configure(&mut cmd);
        cmd.arg("s3api")
            .arg("head-object")
            .arg("--bucket")
            .arg(&self.bucket)
            .arg("--key")
            .arg(key);
        let out = run_command_output(&mut cmd)?;
        if out.status.success() {
            return Ok(true);
        }
        let msg = command_summary(&out);
        if is_not_found_text(&msg) {
            return Ok(false);
        }
        Err(Error::storage(format!("object probe failed for {key}: {msg}")))
    }

    fn put(&mut self, key: &str, payload: &[u8]) -> Result<String> {
        let compressed = compress_payload(payload)?;
        let mut body = tempfile::NamedTempFile::new()?;
        body.write_all(&compressed)?;
        body.flush()?;

        let mut cmd = Command::new("aws");
        self.configure(&mut cmd);
        cmd.arg("s3api")
            .arg("put-object")
            .arg("--bucket")
            .arg(&self.bucket)
            .arg("--key")
            .arg(key)
            .arg("--body")
            .arg(body.path());
        let out = run_command_output(&mut cmd)?;
        if !out.status.success() {
            return Err(Error::storage(format!(
                "object upload failed for {key}: {}",
                command_summary(&out)
            )));
        }
        Ok(key.to_string())
    }
}

/// In-memory store for driving backup runs in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
    put_calls: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn put_calls(&self) -> u32 {
        self.put_calls
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.objects.get(key).map(Vec::as_slice)
    }
}

impl ObjectStore for MemoryStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    fn put(&mut self, key: &str, payload: &[u8]) -> Result<String> {
        let compressed = compress_payload(payload)?;
        self.objects.insert(key.to_string(), compressed);
        self.put_calls += 1;
        Ok(key.to_string())
    }
}

fn run_command_output(cmd: &mut Command) -> Result<Output> {
    cmd.output()
        .map_err(|e| Error::storage(format!("failed to run command {cmd:?}: {e}")))
}

fn command_summary(out: &Output) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    if !stdout.is_empty() {
        return stdout;
    }
    format!("status {}", out.status)
}

fn is_not_found_text(msg: &str) -> bool {
    let m = msg.to_ascii_lowercase();
    m.contains("not found")
        || m.contains("404")
        || m.contains("no such")
        || m.contains("does not exist")
        || m.contains("could not be found")
}
