use std::any::Any;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use once_cell::sync::Lazy;
use wl_quickjs_sys::{
    JSClassDef, JSClassID, JSContext, JSRuntime, JSValue, JS_DefinePropertyValueStr,
    JS_GetFunctionProto, JS_GetOpaque, JS_IsRegisteredClass, JS_NewClass, JS_NewClassID,
    JS_NewObjectProtoClass, JS_SetOpaque, JS_Throw, JS_ThrowInternalError, WL_JS_DupValue,
    JS_PROP_CONFIGURABLE,
};

use crate::context::Context;
use crate::error::Error;
use crate::value::Value;

/// A Rust function callable from JavaScript.
pub(crate) type Callback = dyn Fn(&Context, &Value, &[Value]) -> Result<Value, Error>;

static CLOSURE_CLASS_ID: Lazy<JSClassID> = Lazy::new(|| {
    let mut class_id = 0;
    unsafe {
        JS_NewClassID(&mut class_id);
    }
    class_id
});

/// Registers the closure class with the runtime behind `ctx` on first use.
fn closure_class(ctx: &Context) -> Result<JSClassID, Error> {
    let class_id = *CLOSURE_CLASS_ID;
    let rt = ctx.rt().ptr();
    if unsafe { JS_IsRegisteredClass(rt, class_id) } == 0 {
        let class_def = JSClassDef {
            class_name: c"RustClosure".as_ptr(),
            finalizer: Some(finalize),
            gc_mark: None,
            call: Some(trampoline),
            exotic: ptr::null_mut(),
        };
        if unsafe { JS_NewClass(rt, class_id, &class_def) } != 0 {
            return Err(Error::Callback(
                "failed to register the closure class".to_string(),
            ));
        }
    }
    Ok(class_id)
}

/// Creates a JS function that dispatches to `callback`.
///
/// The function object owns the closure. It is released by the class
/// finalizer once the engine collects the function.
pub(crate) fn new_function(
    ctx: &Context,
    name: &str,
    callback: Box<Callback>,
) -> Result<Value, Error> {
    let class_id = closure_class(ctx)?;
    let func = unsafe {
        let raw = JS_NewObjectProtoClass(ctx.ptr(), JS_GetFunctionProto(ctx.ptr()), class_id);
        let func = Value::from_raw(ctx, raw)?;
        JS_SetOpaque(func.raw(), Box::into_raw(Box::new(callback)) as *mut c_void);
        func
    };

    let name_value = Value::from_primitive(ctx, name)?;
    let rv = unsafe {
        JS_DefinePropertyValueStr(
            ctx.ptr(),
            func.raw(),
            c"name".as_ptr(),
            name_value.into_raw(),
            JS_PROP_CONFIGURABLE as c_int,
        )
    };
    if rv < 0 {
        return Err(ctx.last_error());
    }
    Ok(func)
}

unsafe extern "C" fn finalize(_rt: *mut JSRuntime, val: JSValue) {
    let closure = JS_GetOpaque(val, *CLOSURE_CLASS_ID) as *mut Box<Callback>;
    if !closure.is_null() {
        drop(Box::from_raw(closure));
    }
}

unsafe extern "C" fn trampoline(
    ctx: *mut JSContext,
    func: JSValue,
    this: JSValue,
    argc: c_int,
    argv: *mut JSValue,
    _flags: c_int,
) -> JSValue {
    let Some(context) = Context::from_raw(ctx) else {
        return throw(ctx, "callback invoked on an unmanaged context");
    };
    let closure = JS_GetOpaque(func, *CLOSURE_CLASS_ID) as *const Box<Callback>;
    let Some(callback) = closure.as_ref() else {
        return throw(ctx, "callback has been released");
    };

    // The engine only lends these, so each wrapper takes its own reference.
    let this = Value::from_raw_unchecked(&context, WL_JS_DupValue(ctx, this));
    let args: Vec<Value> = (0..usize::try_from(argc).unwrap_or(0))
        .map(|i| Value::from_raw_unchecked(&context, WL_JS_DupValue(ctx, *argv.add(i))))
        .collect();

    match panic::catch_unwind(AssertUnwindSafe(|| callback(&context, &this, &args))) {
        Ok(Ok(rv)) => rv.into_raw(),
        // Rethrow what a nested call threw so its class and properties survive.
        Ok(Err(Error::JsException(exc))) => match context.take_thrown(&exc) {
            Some(thrown) => JS_Throw(ctx, thrown.into_raw()),
            None => throw(ctx, exc.message()),
        },
        Ok(Err(err)) => throw(ctx, &err.to_string()),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(panic = %msg, "rust callback panicked");
            throw(ctx, &msg)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic in callback: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic in callback: {msg}")
    } else {
        "panic in callback".to_string()
    }
}

/// Raises an `InternalError` and returns the exception marker.
unsafe fn throw(ctx: *mut JSContext, msg: &str) -> JSValue {
    let msg = CString::new(msg.replace('\0', "\\0")).unwrap_or_default();
    JS_ThrowInternalError(ctx, c"%s".as_ptr() as *const c_char, msg.as_ptr())
}

#[cfg(test)]
mod tests {
    use crate::{Context, Error, Primitive, Runtime, Value, ValueKind};
    use anyhow::Result;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_closures_are_callable_from_js() -> Result<()> {
        Context::run(|ctx| {
            let add = Value::from_func(ctx, "add", |ctx, _this, args| {
                let sum: i32 = args.iter().filter_map(Value::as_i32).sum();
                Value::from_primitive(ctx, sum)
            })?;
            ctx.global().set_property("add", add)?;
            assert_eq!(ctx.eval("add(1, 2, 3)")?.as_i32(), Some(6));
            assert_eq!(ctx.eval("add.name")?.as_string()?, "add");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_closures_see_the_receiver() -> Result<()> {
        Context::run(|ctx| {
            let obj = Value::new_object(ctx)?;
            obj.set_property("tag", "receiver")?;
            let get_tag =
                Value::from_func(ctx, "getTag", |_ctx, this, _args| this.get_property("tag"))?;
            obj.set_property("getTag", get_tag)?;
            ctx.global().set_property("obj", obj)?;
            assert_eq!(ctx.eval("obj.getTag()")?.as_string()?, "receiver");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_closure_state_survives_calls() -> Result<()> {
        Context::run(|ctx| {
            let counter = Rc::new(Cell::new(0));
            let seen = counter.clone();
            let tick = Value::from_func(ctx, "tick", move |ctx, _this, _args| {
                seen.set(seen.get() + 1);
                Value::from_primitive(ctx, seen.get())
            })?;
            ctx.global().set_property("tick", tick)?;
            ctx.eval("tick(); tick(); tick();")?;
            assert_eq!(counter.get(), 3);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_callback_errors_become_internal_errors() -> Result<()> {
        Context::run(|ctx| {
            let fail = Value::from_func(ctx, "fail", |_ctx, _this, _args| {
                Err(Error::Callback("no such thing".to_string()))
            })?;
            ctx.global().set_property("fail", fail)?;
            let caught = ctx.eval(
                "try { fail(); 'unreachable' } catch (e) { `${e instanceof InternalError}:${e.message}` }",
            )?;
            assert_eq!(caught.as_string()?, "true:no such thing");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_nested_js_exceptions_are_rethrown() -> Result<()> {
        Context::run(|ctx| {
            let call = Value::from_func(ctx, "call", |ctx, _this, args| match args.first() {
                Some(f) => f.call(&ctx.global(), &[]),
                None => Value::from_primitive(ctx, Primitive::Undefined),
            })?;
            ctx.global().set_property("call", call)?;
            let err = ctx
                .eval("call(() => { throw new TypeError('inner') })")
                .unwrap_err();
            let exc = err.as_js_exception().expect("a js exception");
            assert_eq!(exc.message(), "TypeError: inner");

            let caught = ctx.eval(
                "const thrown = { code: 7 };
                 try { call(() => { throw thrown }) } catch (e) { e === thrown }",
            )?;
            assert!(caught.is_true());
            let caught = ctx.eval(
                "try { call(() => { throw new RangeError('deep') }) }
                 catch (e) { `${e instanceof RangeError}:${e.message}` }",
            )?;
            assert_eq!(caught.as_string()?, "true:deep");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_closures_are_released_with_their_functions() -> Result<()> {
        let rt = Runtime::new()?;
        let ctx = Context::empty(&rt)?;
        let token = Rc::new(());
        for _ in 0..1000 {
            let held = token.clone();
            let func = Value::from_func(&ctx, "noop", move |ctx, _this, _args| {
                let _ = &held;
                Value::from_primitive(ctx, Primitive::Undefined)
            })?;
            drop(func);
        }
        rt.run_gc();
        assert_eq!(Rc::strong_count(&token), 1);

        let held = token.clone();
        let kept = Value::from_func(&ctx, "kept", move |ctx, _this, _args| {
            let _ = &held;
            Value::from_primitive(ctx, Primitive::Undefined)
        })?;
        ctx.global().set_property("kept", kept)?;
        rt.run_gc();
        assert_eq!(Rc::strong_count(&token), 2);

        ctx.eval("delete globalThis.kept")?;
        rt.run_gc();
        assert_eq!(Rc::strong_count(&token), 1);
        Ok(())
    }

    #[test]
    fn test_dropping_the_context_releases_closures() -> Result<()> {
        let token = Rc::new(());
        {
            let rt = Runtime::new()?;
            let ctx = Context::empty(&rt)?;
            let held = token.clone();
            let func = Value::from_func(&ctx, "kept", move |ctx, _this, _args| {
                let _ = &held;
                Value::from_primitive(ctx, Primitive::Undefined)
            })?;
            ctx.global().set_property("kept", func)?;
            assert_eq!(Rc::strong_count(&token), 2);
        }
        assert_eq!(Rc::strong_count(&token), 1);
        Ok(())
    }

    #[test]
    fn test_functions_inherit_from_function_prototype() -> Result<()> {
        Context::run(|ctx| {
            let double = Value::from_func(ctx, "double", |ctx, _this, args| {
                let n = args.first().and_then(Value::as_i32).unwrap_or(0);
                Value::from_primitive(ctx, n * 2)
            })?;
            ctx.global().set_property("double", double)?;
            assert_eq!(ctx.eval("typeof double")?.as_string()?, "function");
            assert!(ctx.eval("double instanceof Function")?.is_true());
            assert_eq!(ctx.eval("double.call(null, 4)")?.as_i32(), Some(8));
            assert_eq!(ctx.eval("[1, 2].map(double).join()")?.as_string()?, "2,4");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_panics_do_not_cross_into_the_engine() -> Result<()> {
        Context::run(|ctx| {
            let boom = Value::from_func(ctx, "boom", |_ctx, _this, _args| -> Result<Value, Error> {
                panic!("kaboom")
            })?;
            ctx.global().set_property("boom", boom)?;
            let err = ctx.eval("boom()").unwrap_err();
            let exc = err.as_js_exception().expect("a js exception");
            assert!(exc.message().contains("kaboom"));
            assert_eq!(ctx.eval("1 + 1")?.as_i32(), Some(2));
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_arguments_outlive_the_call() -> Result<()> {
        Context::run(|ctx| {
            let stash = Rc::new(std::cell::RefCell::new(Vec::new()));
            let keep = stash.clone();
            let store = Value::from_func(ctx, "store", move |ctx, _this, args| {
                keep.borrow_mut().extend(args.iter().cloned());
                Value::from_primitive(ctx, Primitive::Undefined)
            })?;
            ctx.global().set_property("store", store)?;
            ctx.eval("store({ a: 1 }, 'two')")?;
            ctx.rt().run_gc();
            {
                let stash = stash.borrow();
                assert_eq!(stash.len(), 2);
                assert_eq!(stash[0].kind(), ValueKind::Object);
                assert_eq!(stash[0].get_property("a")?.as_i32(), Some(1));
                assert_eq!(stash[1].as_string()?, "two");
            }
            // the stored values keep the context alive
            stash.borrow_mut().clear();
            Ok(())
        })?;
        Ok(())
    }
}
