//! CBOR encoding of bridge messages.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::Value;

pub(crate) fn serialize_to_cbor<T: Serialize>(
    value: &T,
    ty_name: &'static str,
) -> Result<Vec<u8>, Error> {
    let mut rv = Vec::new();
    ciborium::ser::into_writer(value, &mut rv).map_err(|err| {
        Error::new(
            ErrorKind::SerializationError,
            format!("failed to serialize {ty_name}"),
        )
        .with_source(err)
    })?;
    Ok(rv)
}

pub(crate) fn deserialize_from_cbor<T: DeserializeOwned>(
    bytes: &[u8],
    ty_name: &'static str,
) -> Result<T, Error> {
    ciborium::de::from_reader(bytes).map_err(|err| {
        Error::new(
            ErrorKind::SerializationError,
            format!("failed to deserialize {ty_name}"),
        )
        .with_source(err)
    })
}

pub(crate) fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    Value::serialized(value).map_err(|err| {
        Error::new(ErrorKind::SerializationError, "failed to convert payload").with_source(err)
    })
}

pub(crate) fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    value.deserialized().map_err(|err| {
        Error::new(
            ErrorKind::SerializationError,
            "failed to match payload against schema",
        )
        .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::{deserialize_from_cbor, serialize_to_cbor};
    use crate::ErrorKind;

    #[test]
    fn test_garbage_is_a_serialization_error() {
        let err = deserialize_from_cbor::<String>(&[0xff, 0x00], "thing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationError);
        assert_eq!(err.description(), "failed to deserialize thing");
    }

    #[test]
    fn test_text_encoding() -> anyhow::Result<()> {
        // major type 3, length 2
        assert_eq!(serialize_to_cbor(&"hi", "text")?, b"\x62hi");
        Ok(())
    }
}
