use thiserror::Error;

/// Why a single offer was excluded from a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("offer is not a JSON object")]
    NotAnObject,
    #[error("offer is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("offer slug must be a non-empty string")]
    InvalidSlug,
    #[error("offer has malformed publishedAt `{0}`")]
    MalformedTimestamp(String),
}

impl RecordError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject | Self::MissingField(_) | Self::InvalidSlug => "MALFORMED_RECORD",
            Self::MalformedTimestamp(_) => "MALFORMED_TIMESTAMP",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("io failure on `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store request for `{key}` failed: {reason}")]
    Backend { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported upload extension `{0}`; use .json or .jsonl")]
    UnsupportedExtension(String),
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a JSON object or array, found {0}")]
    UnexpectedShape(&'static str),
}

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("object `{0}` does not exist")]
    NotFound(String),
    #[error("object `{0}` is not browsable; expected .json, .jsonl or .log")]
    Unsupported(String),
    #[error("object `{key}` is not valid JSON: {source}")]
    InvalidJson {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
