//! A safe, single threaded JavaScript runtime on top of QuickJS.
//!
//! Every engine value handled here goes through the `WL_` symbol table from
//! `wl-quickjs-sys`, so the reference counting seen by Rust code is exactly
//! the one exported to foreign bindings.
//!
//! ```
//! use wl_js_rt::{Context, Value};
//!
//! # fn main() -> Result<(), wl_js_rt::Error> {
//! Context::run(|ctx| {
//!     let double = Value::from_func(ctx, "double", |ctx, _this, args| {
//!         let n = args.first().and_then(Value::as_i32).unwrap_or(0);
//!         Value::from_primitive(ctx, n * 2)
//!     })?;
//!     ctx.global().set_property("double", double)?;
//!     assert_eq!(ctx.eval("double(21)")?.as_i32(), Some(42));
//!     Ok(())
//! })
//! # }
//! ```

pub mod builtins;
mod callback;
mod config;
mod context;
mod error;
mod js_exception;
mod primitive;
mod properties;
mod runtime;
mod value;

pub use config::{Builtins, Config};
pub use context::Context;
pub use error::Error;
pub use js_exception::JsException;
pub use primitive::Primitive;
pub use properties::PropertiesIter;
pub use runtime::Runtime;
pub use value::{IntoValue, Value, ValueKind};
