use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::wire::{deserialize_from_cbor, from_value, serialize_to_cbor, to_value};
use crate::{Meta, Value};

/// The answer to a [`Request`](crate::Request).
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// ID of the request this response belongs to.
    request_id: Uuid,
    meta: Meta,
    payload: Result<Value, Error>,
}

/// Helps to create response objects.
#[derive(Debug)]
pub struct ResponseBuilder {
    response: Option<Response>,
}

impl Response {
    pub fn new(request_id: Uuid, meta: Meta, payload: Result<Value, Error>) -> Response {
        Response {
            request_id,
            meta,
            payload,
        }
    }

    /// Creates a builder for more complex responses.
    pub fn builder(request_id: Uuid) -> ResponseBuilder {
        ResponseBuilder {
            response: Some(Response::new(request_id, Meta::new(), Ok(Value::Null))),
        }
    }

    pub fn request_id(&self) -> &Uuid {
        &self.request_id
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Consumes the response and returns the payload, or the error it
    /// carries.
    pub fn into_payload(self) -> Result<Value, Error> {
        self.payload
    }

    pub fn payload_ref(&self) -> Option<&Value> {
        self.payload.as_ref().ok()
    }

    pub fn error_ref(&self) -> Option<&Error> {
        self.payload.as_ref().err()
    }

    /// Deserializes the payload into a specific structure.
    ///
    /// Consumes the response so that a carried error can be returned.
    pub fn deserialize_payload<D: DeserializeOwned>(self) -> Result<D, Error> {
        from_value(&self.payload?)
    }

    /// Serializes the response into the wire format.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        serialize_to_cbor(self, "response")
    }

    /// Deserializes a response from the wire format.
    pub fn deserialize(bytes: &[u8]) -> Result<Response, Error> {
        deserialize_from_cbor(bytes, "response")
    }
}

impl ResponseBuilder {
    fn response_mut(&mut self) -> &mut Response {
        self.response.as_mut().expect("builder is already done")
    }

    /// Sets the payload as is.
    pub fn raw_payload<V: Into<Value>>(&mut self, value: V) -> &mut ResponseBuilder {
        self.response_mut().payload = Ok(value.into());
        self
    }

    /// Serializes `value` into the payload.
    pub fn payload<V: Serialize>(&mut self, value: &V) -> Result<&mut ResponseBuilder, Error> {
        let value = to_value(value)?;
        Ok(self.raw_payload(value))
    }

    /// Turns this into an error response.
    pub fn error(&mut self, error: Error) -> &mut ResponseBuilder {
        self.response_mut().payload = Err(error);
        self
    }

    /// Inserts a key/value pair into the meta dictionary.
    pub fn meta<K, V>(&mut self, key: K, value: V) -> &mut ResponseBuilder
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.response_mut().meta.insert(key.into(), value.into());
        self
    }

    /// Creates the response.
    ///
    /// # Panics
    ///
    /// The builder is spent afterwards; any further use panics.
    pub fn build(&mut self) -> Response {
        self.response.take().expect("can only build response once")
    }
}
