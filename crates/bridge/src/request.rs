use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::wire::{deserialize_from_cbor, from_value, serialize_to_cbor, to_value};
use crate::{Meta, Value};

/// A request to an endpoint on the other side of the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Unique per request so several can be in flight at once.
    id: Uuid,
    meta: Meta,
    /// Tells the remote side that no response is wanted.
    fire_and_forget: bool,
    endpoint: String,
    payload: Value,
}

/// Helps to create request objects.
#[derive(Debug)]
pub struct RequestBuilder {
    request: Option<Request>,
}

impl Request {
    /// Creates a basic request to an endpoint.
    pub fn new<S, V>(endpoint: S, payload: V) -> Request
    where
        S: Into<String>,
        V: Into<Value>,
    {
        Request {
            id: Uuid::new_v4(),
            meta: Meta::new(),
            fire_and_forget: false,
            endpoint: endpoint.into(),
            payload: payload.into(),
        }
    }

    /// Creates a builder for more complex requests.
    pub fn build<S: Into<String>>(endpoint: S) -> RequestBuilder {
        RequestBuilder {
            request: Some(Request::new(endpoint, Value::Null)),
        }
    }

    /// Serializes the request into the wire format.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        serialize_to_cbor(self, "request")
    }

    /// Deserializes a request from the wire format.
    pub fn deserialize(bytes: &[u8]) -> Result<Request, Error> {
        deserialize_from_cbor(bytes, "request")
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Deserializes the payload into a specific structure.
    pub fn deserialize_payload<D: DeserializeOwned>(&self) -> Result<D, Error> {
        from_value(&self.payload)
    }

    pub fn fire_and_forget(&self) -> bool {
        self.fire_and_forget
    }
}

impl RequestBuilder {
    fn request_mut(&mut self) -> &mut Request {
        self.request.as_mut().expect("builder is already done")
    }

    /// Overrides the generated request ID.
    pub fn request_id(&mut self, id: Uuid) -> &mut RequestBuilder {
        self.request_mut().id = id;
        self
    }

    /// Sets the payload as is.
    pub fn raw_payload<V: Into<Value>>(&mut self, value: V) -> &mut RequestBuilder {
        self.request_mut().payload = value.into();
        self
    }

    /// Serializes `value` into the payload.
    pub fn payload<V: Serialize>(&mut self, value: &V) -> Result<&mut RequestBuilder, Error> {
        let value = to_value(value)?;
        Ok(self.raw_payload(value))
    }

    pub fn fire_and_forget(&mut self, yes: bool) -> &mut RequestBuilder {
        self.request_mut().fire_and_forget = yes;
        self
    }

    /// Inserts a key/value pair into the meta dictionary.
    pub fn meta<K, V>(&mut self, key: K, value: V) -> &mut RequestBuilder
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.request_mut().meta.insert(key.into(), value.into());
        self
    }

    /// Creates the request.
    ///
    /// # Panics
    ///
    /// The builder is spent afterwards; any further use panics.
    pub fn build(&mut self) -> Request {
        self.request.take().expect("can only build request once")
    }
}
