use std::{fmt, path::PathBuf};

use kube::config::KubeconfigError;

/// Failure to turn a connection descriptor into a usable connection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("kubeconfig not found at {0:?}")]
    Missing(PathBuf),

    #[error("failed to read kubeconfig at {path:?}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error("no context was given and current-context is not set")]
    NoCurrentContext,

    #[error("context {0:?} not found in kubeconfig")]
    UnknownContext(String),

    #[error("context {context:?} refers to unknown cluster {cluster:?}")]
    UnknownCluster { context: String, cluster: String },

    #[error("cluster {0:?} has no server endpoint")]
    MissingEndpoint(String),

    #[error("context {0:?} does not name a user")]
    MissingCredentials(String),

    #[error("context {context:?} refers to unknown user {user:?}")]
    UnknownUser { context: String, user: String },

    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),

    #[error("could not locate a home directory for the default kubeconfig")]
    NoHomeDirectory,

    #[error("failed to load connection settings")]
    Load(#[from] KubeconfigError),

    #[error("failed to build API client")]
    Client(#[source] kube::Error),
}

/// Failure while asking the server which resource kinds it serves.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("malformed group/version {value:?}: {reason}")]
    Malformed { value: String, reason: &'static str },

    #[error("discovery request for {endpoint} failed")]
    Request {
        endpoint: String,
        #[source]
        source: RequestError,
    },
}

/// Failure of a single listing request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{field} {value:?} is not a valid path segment")]
    InvalidSegment { field: &'static str, value: String },

    #[error("failed to build request for {path}")]
    Build {
        path: String,
        #[source]
        source: kube::core::request::Error,
    },

    #[error("server rejected request ({code} {reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("response did not match the expected shape")]
    Decode(#[source] serde_json::Error),

    #[error("transport failure")]
    Transport(#[source] kube::Error),
}

impl RequestError {
    /// HTTP status code reported by the server, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<kube::Error> for RequestError {
    fn from(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(status) => RequestError::Api {
                code: status.code,
                reason: status.reason.clone(),
                message: status.message.clone(),
            },
            kube::Error::SerdeError(source) => RequestError::Decode(source),
            other => RequestError::Transport(other),
        }
    }
}

/// Why a single declared field could not be populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionFailure {
    Missing,
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    OutOfRange,
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionFailure::Missing => f.write_str("is missing"),
            ConversionFailure::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            ConversionFailure::OutOfRange => f.write_str("is out of range"),
        }
    }
}

/// Structural mismatch between a generic document and a typed shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("item {index}: field `{path}` {failure}")]
pub struct ConversionError {
    /// Position of the offending item in the list.
    pub index: usize,
    /// Dotted path of the offending field.
    pub path: String,
    pub failure: ConversionFailure,
}

/// Shape of a generic value, as reported in conversion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Number,
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    pub fn of(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ValueKind::Null,
            serde_json::Value::Bool(_) => ValueKind::Bool,
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            serde_json::Value::Number(_) => ValueKind::Number,
            serde_json::Value::String(_) => ValueKind::String,
            serde_json::Value::Array(_) => ValueKind::Sequence,
            serde_json::Value::Object(_) => ValueKind::Mapping,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Sequence => "sequence",
            ValueKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

/// Any failure surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
