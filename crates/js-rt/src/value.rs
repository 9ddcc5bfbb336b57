use std::borrow::Cow;
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_char, c_int};

use wl_quickjs_sys::{
    JSValue, JS_Call, JS_DefinePropertyValueStr, JS_DefinePropertyValueUint32, JS_FreeCString,
    JS_GetPropertyStr, JS_GetPropertyUint32, JS_IsArray, JS_IsFunction, JS_NewArray, JS_NewObject,
    JS_NewStringLen, JS_ToBigInt64, JS_ToBool, JS_ToCStringLen2, JS_VALUE_GET_FLOAT64,
    JS_VALUE_GET_INT, JS_VALUE_GET_TAG, WL_GetRefCount, WL_JS_DupValue, WL_JS_FreeValue,
    WL_JS_NewBool, WL_JS_NewFloat64, WL_JS_NewInt32, JS_PROP_C_W_E, JS_TAG_BIG_INT, JS_TAG_BOOL,
    JS_TAG_EXCEPTION, JS_TAG_FIRST, JS_TAG_FLOAT64, JS_TAG_INT, JS_TAG_NULL, JS_TAG_STRING,
    JS_TAG_SYMBOL, JS_TAG_UNDEFINED, WL_JS_NULL, WL_JS_UNDEFINED,
};

use crate::callback;
use crate::context::Context;
use crate::error::Error;
use crate::primitive::Primitive;
use crate::properties::PropertiesIter;

/// An enum that indicates of what type a value is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Undefined,
    Null,
    Number,
    BigInt,
    Boolean,
    String,
    Symbol,
    Exception,
    Object,
}

/// A wrapper around a value from the JS engine.
///
/// Every `Value` owns one reference to the engine value: cloning takes
/// another one through `WL_JS_DupValue` and dropping releases it through
/// `WL_JS_FreeValue`.
pub struct Value {
    raw: JSValue,
    ctx: Context,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        let mut s = if kind == ValueKind::Object {
            if self.is_array() {
                f.debug_struct("Array")
            } else if self.is_function() {
                let mut s = f.debug_struct("Function");
                if let Ok(name) = self.get_property("name") {
                    if name.kind() != ValueKind::Undefined {
                        s.field("name", &name.to_string_lossy());
                    }
                }
                s
            } else {
                f.debug_struct("Object")
            }
        } else {
            f.debug_struct(&format!("{:?}", kind))
        };
        if let Some(x) = self.as_primitive() {
            s.field("as_primitive", &x);
        }
        s.field("to_string", &self.to_string_lossy()).finish()
    }
}

impl Value {
    /// Constructs a value from a raw JS value.
    ///
    /// If the value indicates an exception, the actual exception value is fetched
    /// from the context and returned as wrapped error.
    ///
    /// # Safety
    ///
    /// `raw` must belong to `ctx` and the caller hands its reference over.
    pub(crate) unsafe fn from_raw(ctx: &Context, raw: JSValue) -> Result<Value, Error> {
        let val = Value::from_raw_unchecked(ctx, raw);
        if val.kind() == ValueKind::Exception {
            Err(ctx.last_error())
        } else {
            Ok(val)
        }
    }

    /// Constructs a value from a raw JS value without exception handling.
    ///
    /// # Safety
    ///
    /// `raw` must belong to `ctx` and the caller hands its reference over.
    pub(crate) unsafe fn from_raw_unchecked(ctx: &Context, raw: JSValue) -> Value {
        Value {
            raw,
            ctx: ctx.clone(),
        }
    }

    /// Hands out a new reference to the raw value, for APIs that consume one.
    pub(crate) fn into_raw(self) -> JSValue {
        unsafe { WL_JS_DupValue(self.ctx.ptr(), self.raw) }
    }

    pub(crate) fn raw(&self) -> JSValue {
        self.raw
    }

    /// The context this value belongs to.
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Creates a value from a primitive.
    ///
    /// Symbols cannot be created from Rust and fail with
    /// [`Error::Unsupported`].
    pub fn from_primitive<'a, I>(ctx: &Context, value: I) -> Result<Value, Error>
    where
        I: Into<Primitive<'a>>,
    {
        let raw = match value.into() {
            Primitive::Undefined => WL_JS_UNDEFINED.get(),
            Primitive::Null => WL_JS_NULL.get(),
            Primitive::Bool(value) => unsafe { WL_JS_NewBool(ctx.ptr(), c_int::from(value)) },
            Primitive::I32(value) => unsafe { WL_JS_NewInt32(ctx.ptr(), value) },
            Primitive::I64(value) => match i32::try_from(value) {
                Ok(value) => unsafe { WL_JS_NewInt32(ctx.ptr(), value) },
                Err(_) => unsafe { WL_JS_NewFloat64(ctx.ptr(), value as f64) },
            },
            Primitive::F64(value) => unsafe { WL_JS_NewFloat64(ctx.ptr(), value) },
            Primitive::Str(value) => unsafe {
                JS_NewStringLen(
                    ctx.ptr(),
                    value.as_ptr() as *const c_char,
                    value.len() as _,
                )
            },
            Primitive::Symbol(_) => return Err(Error::Unsupported("cannot create symbols")),
        };
        unsafe { Value::from_raw(ctx, raw) }
    }

    /// Creates an array from an iterator.
    pub fn from_iter<I, V>(ctx: &Context, iter: I) -> Result<Value, Error>
    where
        I: IntoIterator<Item = V>,
        V: IntoValue,
    {
        let rv = Value::new_array(ctx)?;
        for (idx, item) in iter.into_iter().enumerate() {
            rv.set_by_index(idx, item.into_value(ctx)?)?;
        }
        Ok(rv)
    }

    /// Creates an empty array
    pub fn new_array(ctx: &Context) -> Result<Value, Error> {
        unsafe { Value::from_raw(ctx, JS_NewArray(ctx.ptr())) }
    }

    /// Creates an empty object
    pub fn new_object(ctx: &Context) -> Result<Value, Error> {
        unsafe { Value::from_raw(ctx, JS_NewObject(ctx.ptr())) }
    }

    /// Wraps a Rust closure in a JavaScript function.
    ///
    /// The closure receives the context, the receiver (`this`) and the call
    /// arguments. Returning an error throws an `InternalError` into the
    /// calling script.
    pub fn from_func<F>(ctx: &Context, name: &str, f: F) -> Result<Value, Error>
    where
        F: Fn(&Context, &Value, &[Value]) -> Result<Value, Error> + 'static,
    {
        callback::new_function(ctx, name, Box::new(f))
    }

    /// Returns the kind of value.
    pub fn kind(&self) -> ValueKind {
        match self.tag() {
            JS_TAG_UNDEFINED => ValueKind::Undefined,
            JS_TAG_NULL => ValueKind::Null,
            JS_TAG_INT | JS_TAG_FLOAT64 => ValueKind::Number,
            JS_TAG_BIG_INT => ValueKind::BigInt,
            JS_TAG_BOOL => ValueKind::Boolean,
            JS_TAG_STRING => ValueKind::String,
            JS_TAG_SYMBOL => ValueKind::Symbol,
            JS_TAG_EXCEPTION => ValueKind::Exception,
            _ => ValueKind::Object,
        }
    }

    /// Maps the value into a rust primitive.
    pub fn as_primitive(&self) -> Option<Primitive<'static>> {
        Some(match self.kind() {
            ValueKind::Undefined => Primitive::Undefined,
            ValueKind::Null => Primitive::Null,
            ValueKind::Number if self.tag() == JS_TAG_INT => Primitive::I32(self.int_unchecked()),
            ValueKind::Number => Primitive::F64(self.as_f64().unwrap_or(f64::NAN)),
            ValueKind::BigInt => Primitive::I64(self.as_i64()?),
            ValueKind::Boolean => Primitive::Bool(self.int_unchecked() != 0),
            ValueKind::String => Primitive::Str(Cow::Owned(self.to_string_lossy())),
            ValueKind::Symbol => Primitive::Symbol(
                self.get_property("description")
                    .map(|desc| desc.to_string_lossy())
                    .unwrap_or_default(),
            ),
            ValueKind::Exception | ValueKind::Object => return None,
        })
    }

    /// Returns the value converted to a string, the way `String(value)` would.
    ///
    /// Fails if the conversion throws or yields invalid unicode (lone
    /// surrogates).
    pub fn as_string(&self) -> Result<String, Error> {
        let bytes = self.to_c_string()?;
        String::from_utf8(bytes).map_err(|err| Error::Utf8Error(err.utf8_error()))
    }

    /// Returns the value as string with lossy unicode recovery.
    ///
    /// Values that cannot be stringified produce an empty string.
    pub fn to_string_lossy(&self) -> String {
        match self.to_c_string() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }

    fn to_c_string(&self) -> Result<Vec<u8>, Error> {
        unsafe {
            let mut len = 0;
            let ptr = JS_ToCStringLen2(self.ctx.ptr(), &mut len, self.raw, 0);
            // symbols for instance refuse the conversion and leave an
            // exception behind.
            if ptr.is_null() {
                return Err(self.ctx.last_error());
            }
            let bytes = std::slice::from_raw_parts(ptr as *const u8, len as usize).to_vec();
            JS_FreeCString(self.ctx.ptr(), ptr);
            Ok(bytes)
        }
    }

    /// If the value is a number (or a bigint that survives the trip), returns
    /// it as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self.tag() {
            JS_TAG_FLOAT64 => Some(unsafe { JS_VALUE_GET_FLOAT64(self.raw) }),
            JS_TAG_INT => Some(self.int_unchecked() as f64),
            JS_TAG_BIG_INT => self.as_i64().and_then(|val| {
                if val as f64 as i64 == val {
                    Some(val as f64)
                } else {
                    None
                }
            }),
            _ => None,
        }
    }

    /// If the value is an integer that fits into 32 bits, returns it.
    pub fn as_i32(&self) -> Option<i32> {
        match self.tag() {
            JS_TAG_INT => Some(self.int_unchecked()),
            JS_TAG_FLOAT64 | JS_TAG_BIG_INT => self.as_i64().and_then(|x| i32::try_from(x).ok()),
            _ => None,
        }
    }

    /// If the value is an integer that fits into 64 bits, returns it.
    pub fn as_i64(&self) -> Option<i64> {
        match self.tag() {
            JS_TAG_INT => Some(self.int_unchecked().into()),
            JS_TAG_FLOAT64 => {
                let val = unsafe { JS_VALUE_GET_FLOAT64(self.raw) };
                if val.trunc() == val && val >= i64::MIN as f64 && val < i64::MAX as f64 {
                    Some(val as i64)
                } else {
                    None
                }
            }
            JS_TAG_BIG_INT => {
                let mut pres: i64 = 0;
                if unsafe { JS_ToBigInt64(self.ctx.ptr(), &mut pres, self.raw) } < 0 {
                    // drop the pending exception
                    let _ = self.ctx.last_error();
                    None
                } else {
                    Some(pres)
                }
            }
            _ => None,
        }
    }

    /// Returns `true` if this value is truthy.
    pub fn is_true(&self) -> bool {
        unsafe { JS_ToBool(self.ctx.ptr(), self.raw) > 0 }
    }

    /// Returns the engine reference count, 0 for values that are not
    /// reference counted.
    pub fn ref_count(&self) -> i32 {
        unsafe { WL_GetRefCount(self.raw) }
    }

    /// Looks up a property on the object.
    pub fn get_property(&self, key: &str) -> Result<Value, Error> {
        let cstring_key = CString::new(key)?;
        unsafe {
            let raw = JS_GetPropertyStr(self.ctx.ptr(), self.raw, cstring_key.as_ptr());
            Value::from_raw(&self.ctx, raw)
        }
    }

    /// Sets a property to the object.
    pub fn set_property<V: IntoValue>(&self, key: &str, value: V) -> Result<(), Error> {
        let key = CString::new(key)?;
        let value = value.into_value(&self.ctx)?;
        let rv = unsafe {
            JS_DefinePropertyValueStr(
                self.ctx.ptr(),
                self.raw,
                key.as_ptr(),
                value.into_raw(),
                JS_PROP_C_W_E as c_int,
            )
        };

        if rv < 0 {
            Err(self.ctx.last_error())
        } else {
            Ok(())
        }
    }

    /// Looks up a property by index (eg: array).
    pub fn get_by_index(&self, idx: usize) -> Result<Value, Error> {
        let idx = u32::try_from(idx).map_err(Error::IntOverflow)?;
        unsafe {
            let raw = JS_GetPropertyUint32(self.ctx.ptr(), self.raw, idx);
            Value::from_raw(&self.ctx, raw)
        }
    }

    /// Places a value at a certain index.
    pub fn set_by_index<V: IntoValue>(&self, idx: usize, value: V) -> Result<(), Error> {
        let idx = u32::try_from(idx).map_err(|_| Error::InvalidLength)?;
        let value = value.into_value(&self.ctx)?;
        let rv = unsafe {
            JS_DefinePropertyValueUint32(
                self.ctx.ptr(),
                self.raw,
                idx,
                value.into_raw(),
                JS_PROP_C_W_E as c_int,
            )
        };

        if rv < 0 {
            Err(self.ctx.last_error())
        } else {
            Ok(())
        }
    }

    /// Appends a value to the end of an array.
    pub fn append<V: IntoValue>(&self, value: V) -> Result<(), Error> {
        let len = self
            .get_property("length")?
            .as_i64()
            .and_then(|x| usize::try_from(x).ok())
            .ok_or(Error::InvalidLength)?;
        self.set_by_index(len, value)
    }

    /// Iterates over the own enumerable string-keyed properties.
    pub fn properties(&self) -> Result<PropertiesIter, Error> {
        PropertiesIter::new(self)
    }

    /// Checks if this object is a function.
    pub fn is_function(&self) -> bool {
        unsafe { JS_IsFunction(self.ctx.ptr(), self.raw) != 0 }
    }

    /// Checks if this object is an array
    pub fn is_array(&self) -> bool {
        unsafe { JS_IsArray(self.ctx.ptr(), self.raw) > 0 }
    }

    /// Calls the object.
    pub fn call(&self, receiver: &Value, args: &[Value]) -> Result<Value, Error> {
        let mut args: Vec<JSValue> = args.iter().map(|v| v.raw).collect();
        unsafe {
            let rv = JS_Call(
                self.ctx.ptr(),
                self.raw,
                receiver.raw,
                args.len() as c_int,
                args.as_mut_ptr(),
            );
            Value::from_raw(&self.ctx, rv)
        }
    }

    /// Returns the length of the value.
    ///
    /// This basically returns the result of the `length` property on the JS side.
    pub fn len(&self) -> Option<usize> {
        match self.kind() {
            ValueKind::Undefined
            | ValueKind::Null
            | ValueKind::Number
            | ValueKind::BigInt
            | ValueKind::Boolean => None,
            _ => self
                .get_property("length")
                .ok()?
                .as_i64()
                .and_then(|x| usize::try_from(x).ok()),
        }
    }

    /// Returns the internal tag of the value, folding every float encoding
    /// onto `JS_TAG_FLOAT64`.
    fn tag(&self) -> i32 {
        let tag = unsafe { JS_VALUE_GET_TAG(self.raw) };
        // NaN boxing (wasm32) spreads floats over the tags above the last
        // real one.
        if (tag - JS_TAG_FIRST) as u32 >= (JS_TAG_FLOAT64 - JS_TAG_FIRST) as u32 {
            JS_TAG_FLOAT64
        } else {
            tag
        }
    }

    fn int_unchecked(&self) -> i32 {
        unsafe { JS_VALUE_GET_INT(self.raw) }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self {
            raw: unsafe { WL_JS_DupValue(self.ctx.ptr(), self.raw) },
            ctx: self.ctx.clone(),
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        unsafe {
            WL_JS_FreeValue(self.ctx.ptr(), self.raw);
        }
    }
}

/// Conversion into an engine value bound to a context.
pub trait IntoValue {
    fn into_value(self, ctx: &Context) -> Result<Value, Error>;
}

impl IntoValue for Value {
    fn into_value(self, _ctx: &Context) -> Result<Value, Error> {
        Ok(self)
    }
}

impl IntoValue for &Value {
    fn into_value(self, _ctx: &Context) -> Result<Value, Error> {
        Ok(self.clone())
    }
}

impl<'a> IntoValue for Primitive<'a> {
    fn into_value(self, ctx: &Context) -> Result<Value, Error> {
        Value::from_primitive(ctx, self)
    }
}

macro_rules! into_value_via_primitive {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self, ctx: &Context) -> Result<Value, Error> {
                    Value::from_primitive(ctx, self)
                }
            }
        )*
    };
}

into_value_via_primitive!(bool, i32, i64, f64, usize, &str, String);
