use std::borrow::Cow;

/// Alternative value representation on the Rust side.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive<'a> {
    Undefined,
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(Cow<'a, str>),
    Symbol(String),
}

impl Primitive<'_> {
    /// Detaches the primitive from any borrowed string.
    pub fn into_owned(self) -> Primitive<'static> {
        match self {
            Primitive::Undefined => Primitive::Undefined,
            Primitive::Null => Primitive::Null,
            Primitive::Bool(v) => Primitive::Bool(v),
            Primitive::I32(v) => Primitive::I32(v),
            Primitive::I64(v) => Primitive::I64(v),
            Primitive::F64(v) => Primitive::F64(v),
            Primitive::Str(v) => Primitive::Str(Cow::Owned(v.into_owned())),
            Primitive::Symbol(v) => Primitive::Symbol(v),
        }
    }
}

impl From<bool> for Primitive<'static> {
    fn from(value: bool) -> Primitive<'static> {
        Primitive::Bool(value)
    }
}

impl From<usize> for Primitive<'static> {
    fn from(value: usize) -> Primitive<'static> {
        Primitive::F64(value as f64)
    }
}

impl From<i32> for Primitive<'static> {
    fn from(value: i32) -> Primitive<'static> {
        Primitive::I32(value)
    }
}

impl From<i64> for Primitive<'static> {
    fn from(value: i64) -> Primitive<'static> {
        Primitive::I64(value)
    }
}

impl From<f64> for Primitive<'static> {
    fn from(value: f64) -> Primitive<'static> {
        Primitive::F64(value)
    }
}

impl<'a> From<&'a str> for Primitive<'a> {
    fn from(value: &'a str) -> Self {
        Primitive::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Primitive<'static> {
    fn from(value: String) -> Self {
        Primitive::Str(Cow::Owned(value))
    }
}
