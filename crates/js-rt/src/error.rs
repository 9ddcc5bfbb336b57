use std::ffi::NulError;
use std::num::TryFromIntError;
use std::str::Utf8Error;

use thiserror::Error;

use crate::js_exception::JsException;

/// Errors produced by the runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("quickjs failed to initialize runtime")]
    RuntimeInit,
    #[error("quickjs failed to initialize context")]
    ContextInit,
    #[error("unexpected null byte")]
    NulError(#[from] NulError),
    #[error("Uncaught {0}")]
    JsException(JsException),
    #[error("utf-8 error")]
    Utf8Error(#[source] Utf8Error),
    #[error("integer overflow")]
    IntOverflow(#[source] TryFromIntError),
    #[error("invalid length")]
    InvalidLength,
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("{0}")]
    Callback(String),
}

impl Error {
    /// Returns the JavaScript exception if this error carries one.
    pub fn as_js_exception(&self) -> Option<&JsException> {
        match self {
            Error::JsException(exc) => Some(exc),
            _ => None,
        }
    }
}
