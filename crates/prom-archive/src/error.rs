use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Bad chunk size, bad range, missing or malformed settings. Fatal
    /// before any metric processing starts.
    Config(String),
    /// Metric name is not in the upstream's label set.
    InvalidMetric(String),
    /// Non-success response from the query API after retry exhaustion.
    Upstream { status: u16, body: String },
    /// Transport-level failure outside the chunk retry loop.
    Request(String),
    /// Object store rejected an operation, or spooling the payload failed.
    Storage(String),
}

impl Error {
    pub fn config<M: Into<String>>(msg: M) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_metric<M: Into<String>>(name: M) -> Self {
        Self::InvalidMetric(name.into())
    }

    pub fn upstream<B: Into<String>>(status: u16, body: B) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    pub fn storage<M: Into<String>>(msg: M) -> Self {
        Self::Storage(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "{msg}"),
            Self::InvalidMetric(name) => write!(f, "{name} is not a valid metric"),
            Self::Upstream { status, body } => {
                write!(f, "HTTP status code {status} ({body})")
            }
            Self::Request(msg) => write!(f, "request failed: {msg}"),
            Self::Storage(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("payload encode failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
