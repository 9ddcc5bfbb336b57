//! The protocol spoken between a host and its plugins.
//!
//! A host sends a [`Request`] naming an endpoint and carrying an arbitrary
//! CBOR payload; unless the request is fire-and-forget, the plugin answers
//! with a [`Response`] holding either a payload or an [`Error`]. On the
//! plugin side a [`Router`] maps endpoints to handlers.

mod error;
mod request;
mod response;
mod router;
mod wire;

use std::collections::BTreeMap;

pub use self::error::{Error, ErrorKind};
pub use self::request::{Request, RequestBuilder};
pub use self::response::{Response, ResponseBuilder};
pub use self::router::Router;

/// The type for arbitrary values.
pub type Value = ciborium::value::Value;

/// Key/value pairs of meta information attached to messages.
pub type Meta = BTreeMap<String, Value>;
