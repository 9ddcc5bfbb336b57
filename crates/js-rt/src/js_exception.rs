use std::fmt;

use wl_quickjs_sys::JS_IsError;

use crate::value::{Value, ValueKind};

/// Represents a JavaScript exception.
///
/// Holds the stringified exception and, when the thrown value is an `Error`
/// object, its stack trace.
#[derive(Debug, Clone)]
pub struct JsException {
    msg: String,
    stack: Option<String>,
    serial: u64,
}

impl JsException {
    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the stringified stack if available
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Identifies the thrown value the context kept for rethrowing.
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    /// Describes an arbitrary thrown value.
    pub(crate) fn from_value(exc: &Value, serial: u64) -> JsException {
        let msg = exc.to_string_lossy();
        let mut stack = None;
        if unsafe { JS_IsError(exc.ctx().ptr(), exc.raw()) } != 0 {
            if let Ok(stack_value) = exc.get_property("stack") {
                if stack_value.kind() != ValueKind::Undefined {
                    stack.replace(stack_value.to_string_lossy());
                }
            }
        }

        JsException { msg, stack, serial }
    }
}

impl fmt::Display for JsException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if let Some(stack) = &self.stack {
            write!(f, "\n{stack}")?;
        }
        Ok(())
    }
}
