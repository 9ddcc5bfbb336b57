use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error carried across the bridge.
///
/// Besides errors reported by the remote side this is also produced for
/// failures local to one side, such as a payload that does not serialize.
/// The `source` never travels over the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Error {
    kind: ErrorKind,
    description: String,
    detail: Option<Value>,
    #[serde(skip)]
    source: Option<BoxedSource>,
}

/// Indicates the kind of an error.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request went to an unknown endpoint.
    UnknownEndpoint,
    /// The handler on the other side failed.
    InternalError,
    /// A request or response could not be (de)serialized.
    SerializationError,
    /// Any other error code.
    Other(u32),
}

impl ErrorKind {
    /// The numeric code of the kind.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::UnknownEndpoint => 404,
            ErrorKind::InternalError => 500,
            ErrorKind::SerializationError => 999,
            ErrorKind::Other(code) => code,
        }
    }

    /// Maps a numeric code back onto a kind.
    pub fn from_code(code: u32) -> ErrorKind {
        match code {
            404 => ErrorKind::UnknownEndpoint,
            500 => ErrorKind::InternalError,
            999 => ErrorKind::SerializationError,
            code => ErrorKind::Other(code),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnknownEndpoint => write!(f, "unknown_endpoint"),
            ErrorKind::InternalError => write!(f, "internal_error"),
            ErrorKind::SerializationError => write!(f, "serialization_error"),
            ErrorKind::Other(code) => write!(f, "error {code}"),
        }
    }
}

impl Error {
    /// Creates a new error.
    pub fn new<S: Into<String>>(kind: ErrorKind, description: S) -> Error {
        Error {
            kind,
            description: description.into(),
            detail: None,
            source: None,
        }
    }

    /// Attaches a detail value.
    pub fn with_detail<V: Into<Value>>(mut self, detail: V) -> Error {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches another error as source.
    pub fn with_source<E>(mut self, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)?;
        if let Some(Value::Text(detail)) = &self.detail {
            write!(f, "\n{detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}
