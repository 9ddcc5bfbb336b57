//! QuickJS bindings for the wl runtime.
//!
//! Everything from the engine is re-exported as is. On top of that the crate
//! exports the `WL_` symbol table (see `include/wl_api.h`) so that foreign
//! binding generators can link against the value helpers QuickJS only ships
//! as `static inline` functions. Native and wasm builds export the same set.

#![allow(non_snake_case)]

mod api;

pub use api::*;
pub use rquickjs_sys::*;

#[cfg(test)]
mod tests {
    use std::mem;

    use super::JSValue;

    const HEADER: &str = include_str!("../include/wl_api.h");

    #[test]
    fn test_header_does_not_need_engine_headers() {
        assert!(!HEADER.contains("#include \"quickjs.h\""));
        assert!(HEADER.contains("#ifndef QUICKJS_H"));
        assert!(HEADER.contains("typedef struct JSContext JSContext;"));
    }

    #[test]
    fn test_header_declares_every_symbol() {
        for symbol in [
            "WL_GetRefCount(",
            "WL_JS_DupValue(",
            "WL_JS_FreeValue(",
            "WL_JS_NewFloat64(",
            "WL_JS_NewInt32(",
            "WL_JS_NewBool(",
            "WL_JS_NULL;",
            "WL_JS_UNDEFINED;",
            "WL_JS_TRUE;",
        ] {
            assert!(HEADER.contains(symbol), "missing {symbol}");
        }
    }

    #[test]
    fn test_header_value_layout_matches_engine() {
        let expected = if cfg!(target_pointer_width = "64") { 16 } else { 8 };
        assert_eq!(mem::size_of::<JSValue>(), expected);
    }
}
