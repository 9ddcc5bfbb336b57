//! The `WL_` symbol table.
//!
//! Most of the QuickJS value helpers are `static inline` in `quickjs.h`, so a
//! binding generator has nothing to link against. The functions and statics
//! below give those helpers real, unmangled symbols that cannot collide with
//! the engine's own `JS_` names. Each one builds or touches values exactly the
//! way the C helper does. Constructors keep the `ctx` argument of the C API even
//! where the value does not need it.

use std::os::raw::{c_int, c_uint};

use rquickjs_sys::{
    JSContext, JSRefCountHeader, JSValue, JS_DupValue, JS_FreeValue, JS_MKVAL,
    JS_VALUE_GET_PTR, JS_VALUE_GET_TAG, JS_NULL, JS_TAG_BOOL, JS_TAG_FIRST, JS_TAG_INT, JS_TRUE,
    JS_UNDEFINED, __JS_NewFloat64,
};

/// An engine value that can live in an exported `static`.
///
/// `JSValue` may carry a raw pointer, which makes it `!Sync`. The sentinels
/// exported here never point anywhere, and the wrapper is transparent so the
/// symbol has exactly the layout of a `JSValue` on the C side.
#[repr(transparent)]
pub struct ConstValue(JSValue);

// SAFETY: only pointer-free sentinel values are ever stored in a `ConstValue`.
unsafe impl Sync for ConstValue {}

impl ConstValue {
    /// Returns the wrapped engine value.
    pub const fn get(&self) -> JSValue {
        self.0
    }
}

#[no_mangle]
pub static WL_JS_NULL: ConstValue = ConstValue(JS_NULL);

#[no_mangle]
pub static WL_JS_UNDEFINED: ConstValue = ConstValue(JS_UNDEFINED);

#[no_mangle]
pub static WL_JS_TRUE: ConstValue = ConstValue(JS_TRUE);

/// Wraps a double as an engine value.
///
/// The result is always float tagged, integral values included. `-0.0` and
/// NaN payloads keep their bits.
///
/// # Safety
///
/// `ctx` must be a live context.
#[no_mangle]
pub unsafe extern "C" fn WL_JS_NewFloat64(_ctx: *mut JSContext, d: f64) -> JSValue {
    __JS_NewFloat64(d)
}

/// Wraps a 32-bit integer as an engine value.
///
/// # Safety
///
/// `ctx` must be a live context.
#[no_mangle]
pub unsafe extern "C" fn WL_JS_NewInt32(_ctx: *mut JSContext, val: i32) -> JSValue {
    JS_MKVAL(JS_TAG_INT, val)
}

/// Wraps a C boolean flag as an engine value. Any non-zero flag is `true`.
///
/// # Safety
///
/// `ctx` must be a live context.
#[no_mangle]
pub unsafe extern "C" fn WL_JS_NewBool(_ctx: *mut JSContext, val: c_int) -> JSValue {
    JS_MKVAL(JS_TAG_BOOL, c_int::from(val != 0))
}

/// Takes another reference to `v` and returns it.
///
/// # Safety
///
/// `ctx` must be a live context and `v` a value that belongs to it.
#[no_mangle]
pub unsafe extern "C" fn WL_JS_DupValue(_ctx: *mut JSContext, v: JSValue) -> JSValue {
    JS_DupValue(v)
}

/// Releases one reference to `v`, freeing it when none are left.
///
/// # Safety
///
/// `ctx` must be a live context and `v` a value that belongs to it. The
/// caller gives up the reference it passes in.
#[no_mangle]
pub unsafe extern "C" fn WL_JS_FreeValue(ctx: *mut JSContext, v: JSValue) {
    JS_FreeValue(ctx, v)
}

/// Returns the reference count of `v`, or 0 when `v` is not reference counted.
///
/// # Safety
///
/// A reference counted `v` must still be alive.
#[no_mangle]
pub unsafe extern "C" fn WL_GetRefCount(v: JSValue) -> c_int {
    if !has_ref_count(v) {
        return 0;
    }
    let header = JS_VALUE_GET_PTR(v) as *const JSRefCountHeader;
    (*header).ref_count
}

/// Mirrors `JS_VALUE_HAS_REF_COUNT`: every tag below `JS_TAG_FIRST` points at
/// a heap cell that starts with a `JSRefCountHeader`.
unsafe fn has_ref_count(v: JSValue) -> bool {
    (JS_VALUE_GET_TAG(v) as c_uint) >= (JS_TAG_FIRST as c_uint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use quickcheck::{quickcheck, TestResult};
    use rquickjs_sys::{
        JSRuntime, JS_FreeContext, JS_FreeRuntime, JS_NewContext, JS_NewObject, JS_NewRuntime,
        JS_VALUE_GET_FLOAT64, JS_VALUE_GET_INT, JS_VALUE_GET_NORM_TAG, JS_TAG_FLOAT64,
        JS_TAG_NULL, JS_TAG_OBJECT, JS_TAG_UNDEFINED,
    };

    struct Engine {
        rt: *mut JSRuntime,
        ctx: *mut JSContext,
    }

    impl Engine {
        fn new() -> Result<Self> {
            let rt = unsafe { JS_NewRuntime() };
            if rt.is_null() {
                bail!("Couldn't create JavaScript runtime");
            }
            let ctx = unsafe { JS_NewContext(rt) };
            if ctx.is_null() {
                unsafe { JS_FreeRuntime(rt) };
                bail!("Couldn't create JavaScript context");
            }
            Ok(Self { rt, ctx })
        }
    }

    impl Drop for Engine {
        fn drop(&mut self) {
            unsafe {
                JS_FreeContext(self.ctx);
                JS_FreeRuntime(self.rt);
            }
        }
    }

    fn tag(v: JSValue) -> i32 {
        unsafe { JS_VALUE_GET_NORM_TAG(v) }
    }

    #[test]
    fn test_sentinels_alias_engine_singletons() {
        assert_eq!(tag(WL_JS_NULL.get()), JS_TAG_NULL);
        assert_eq!(tag(WL_JS_UNDEFINED.get()), JS_TAG_UNDEFINED);
        assert_eq!(tag(WL_JS_TRUE.get()), JS_TAG_BOOL);
        assert_eq!(unsafe { JS_VALUE_GET_INT(WL_JS_TRUE.get()) }, 1);
    }

    #[test]
    fn test_sentinels_are_not_ref_counted() {
        unsafe {
            assert_eq!(WL_GetRefCount(WL_JS_NULL.get()), 0);
            assert_eq!(WL_GetRefCount(WL_JS_UNDEFINED.get()), 0);
            assert_eq!(WL_GetRefCount(WL_JS_TRUE.get()), 0);
        }
    }

    #[test]
    fn test_new_bool_normalizes_flags() -> Result<()> {
        let engine = Engine::new()?;
        for (flag, expected) in [(0, 0), (1, 1), (-1, 1), (42, 1)] {
            let val = unsafe { WL_JS_NewBool(engine.ctx, flag) };
            assert_eq!(tag(val), JS_TAG_BOOL);
            assert_eq!(unsafe { JS_VALUE_GET_INT(val) }, expected);
        }
        Ok(())
    }

    #[test]
    fn test_new_float64_wraps_fractions_as_floats() -> Result<()> {
        let engine = Engine::new()?;
        let val = unsafe { WL_JS_NewFloat64(engine.ctx, 2.5) };
        assert_eq!(tag(val), JS_TAG_FLOAT64);
        assert_eq!(unsafe { JS_VALUE_GET_FLOAT64(val) }, 2.5);
        Ok(())
    }

    #[test]
    fn test_new_float64_keeps_integral_values_float_tagged() -> Result<()> {
        let engine = Engine::new()?;
        for d in [2.0, 0.0, -0.0, -7.0, 1e300] {
            let val = unsafe { WL_JS_NewFloat64(engine.ctx, d) };
            assert_eq!(tag(val), JS_TAG_FLOAT64, "tag of {d:?}");
            assert_eq!(unsafe { JS_VALUE_GET_FLOAT64(val) }.to_bits(), d.to_bits());
            assert_eq!(unsafe { WL_GetRefCount(val) }, 0);
        }
        Ok(())
    }

    #[test]
    fn test_numbers_are_not_ref_counted() -> Result<()> {
        let engine = Engine::new()?;
        unsafe {
            assert_eq!(WL_GetRefCount(WL_JS_NewInt32(engine.ctx, 7)), 0);
            assert_eq!(WL_GetRefCount(WL_JS_NewFloat64(engine.ctx, 0.5)), 0);
        }
        Ok(())
    }

    #[test]
    fn test_dup_then_free_leaves_ref_count_unchanged() -> Result<()> {
        let engine = Engine::new()?;
        unsafe {
            let obj = JS_NewObject(engine.ctx);
            assert_eq!(tag(obj), JS_TAG_OBJECT);
            assert_eq!(WL_GetRefCount(obj), 1);

            let dup = WL_JS_DupValue(engine.ctx, obj);
            assert_eq!(WL_GetRefCount(obj), 2);
            assert_eq!(WL_GetRefCount(dup), 2);

            WL_JS_FreeValue(engine.ctx, dup);
            assert_eq!(WL_GetRefCount(obj), 1);

            WL_JS_FreeValue(engine.ctx, obj);
        }
        Ok(())
    }

    #[test]
    fn test_dup_of_sentinel_is_a_no_op() -> Result<()> {
        let engine = Engine::new()?;
        unsafe {
            let val = WL_JS_DupValue(engine.ctx, WL_JS_NULL.get());
            assert_eq!(tag(val), JS_TAG_NULL);
            assert_eq!(WL_GetRefCount(val), 0);
            WL_JS_FreeValue(engine.ctx, val);
        }
        Ok(())
    }

    quickcheck! {
        fn prop_new_int32_is_int_tagged(n: i32) -> bool {
            let Ok(engine) = Engine::new() else { return false };
            let wrapped = unsafe { WL_JS_NewInt32(engine.ctx, n) };
            tag(wrapped) == JS_TAG_INT && unsafe { JS_VALUE_GET_INT(wrapped) } == n
        }

        fn prop_new_float64_preserves_bits(d: f64) -> TestResult {
            if d.is_nan() {
                return TestResult::discard();
            }
            let Ok(engine) = Engine::new() else { return TestResult::failed() };
            let wrapped = unsafe { WL_JS_NewFloat64(engine.ctx, d) };
            TestResult::from_bool(
                tag(wrapped) == JS_TAG_FLOAT64
                    && unsafe { JS_VALUE_GET_FLOAT64(wrapped) }.to_bits() == d.to_bits(),
            )
        }

        fn prop_new_bool_matches_engine_constants(flag: i32) -> bool {
            let Ok(engine) = Engine::new() else { return false };
            let wrapped = unsafe { WL_JS_NewBool(engine.ctx, flag) };
            let expected = if flag != 0 { JS_TRUE } else { rquickjs_sys::JS_FALSE };
            tag(wrapped) == tag(expected)
                && unsafe { JS_VALUE_GET_INT(wrapped) == JS_VALUE_GET_INT(expected) }
        }
    }
}
