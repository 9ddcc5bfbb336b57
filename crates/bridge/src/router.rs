use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use crate::error::{Error, ErrorKind};
use crate::request::Request;
use crate::response::Response;
use crate::Value;

type Handler = Box<dyn Fn(&Request) -> Result<Value, Error>>;

/// Dispatches requests to handlers by endpoint name.
///
/// This is the plugin side of the bridge: a plugin reads one request from
/// its input, routes it and writes the response to its output.
#[derive(Default)]
pub struct Router {
    handlers: BTreeMap<String, Handler>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("endpoints", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    pub fn new() -> Router {
        Router::default()
    }

    /// Registers `handler` for `endpoint`, replacing an earlier one.
    pub fn route<S, F>(&mut self, endpoint: S, handler: F) -> &mut Router
    where
        S: Into<String>,
        F: Fn(&Request) -> Result<Value, Error> + 'static,
    {
        self.handlers.insert(endpoint.into(), Box::new(handler));
        self
    }

    /// Names of the registered endpoints, sorted.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Runs the handler for a request.
    ///
    /// Returns `None` for fire-and-forget requests, whose outcome is only
    /// logged.
    pub fn handle(&self, request: &Request) -> Option<Response> {
        let result = match self.handlers.get(request.endpoint()) {
            Some(handler) => handler(request),
            None => Err(Error::new(
                ErrorKind::UnknownEndpoint,
                format!("no endpoint named '{}'", request.endpoint()),
            )),
        };

        if request.fire_and_forget() {
            if let Err(err) = &result {
                tracing::warn!(
                    endpoint = request.endpoint(),
                    error = %err,
                    "fire-and-forget request failed"
                );
            }
            return None;
        }

        let mut builder = Response::builder(*request.id());
        match result {
            Ok(payload) => builder.raw_payload(payload),
            Err(err) => builder.error(err),
        };
        Some(builder.build())
    }

    /// Reads a request from `reader` until end of input and writes the
    /// response, if any, to `writer`.
    ///
    /// Input that is not a request is answered with a serialization error
    /// under the nil request ID.
    pub fn serve<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<(), Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(io_error)?;

        let response = match Request::deserialize(&buf) {
            Ok(request) => {
                tracing::debug!(
                    id = %request.id(),
                    endpoint = request.endpoint(),
                    "routing request"
                );
                self.handle(&request)
            }
            Err(err) => Some(Response::builder(uuid::Uuid::nil()).error(err).build()),
        };

        if let Some(response) = response {
            let bytes = response.serialize()?;
            writer.write_all(&bytes).map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }
        Ok(())
    }
}

fn io_error(err: io::Error) -> Error {
    Error::new(ErrorKind::InternalError, "bridge i/o failed").with_source(err)
}
