//! JSON on the command line, CBOR values on the bridge.

use anyhow::{Context, Result};
use wl_bridge::Value;

pub fn from_json(json: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(json).context("payload is not valid JSON")?;
    Value::serialized(&json).context("payload cannot be encoded")
}

pub fn to_json(value: &Value) -> Result<String> {
    let json: serde_json::Value = value
        .deserialized()
        .context("response payload has no JSON representation")?;
    Ok(serde_json::to_string(&json)?)
}
