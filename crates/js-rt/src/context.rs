use std::cell::Cell;
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_int, c_void};
use std::ptr;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use wl_quickjs_sys::{
    JSContext, JSValue, JS_Eval, JS_ExecutePendingJob, JS_FreeContext, JS_GetContextOpaque,
    JS_GetException, JS_GetGlobalObject, JS_NewContext, JS_SetContextOpaque, WL_JS_FreeValue,
    JS_EVAL_TYPE_GLOBAL,
};

use crate::builtins;
use crate::error::Error;
use crate::js_exception::JsException;
use crate::runtime::Runtime;
use crate::value::Value;

/// Serial numbers for taken exceptions, unique across contexts.
static NEXT_THROWN: AtomicU64 = AtomicU64::new(1);

struct ContextHandle {
    ptr: *mut JSContext,
    rt: Runtime,
    /// The last exception taken out of the engine and its serial. Holds one
    /// reference to the value.
    thrown: Cell<Option<(u64, JSValue)>>,
}

/// Wraps a QuickJS context.
///
/// This is a non thread-safe handle like object that can be cloned
/// cheaply to increment the refcount.
#[derive(Clone)]
pub struct Context {
    handle: Rc<ContextHandle>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish()
    }
}

impl Context {
    /// Creates a completely empty context.
    pub fn empty(rt: &Runtime) -> Result<Context, Error> {
        let ptr = unsafe { JS_NewContext(rt.ptr()) };
        if ptr.is_null() {
            return Err(Error::ContextInit);
        }

        let handle = Rc::new(ContextHandle {
            ptr,
            rt: rt.clone(),
            thrown: Cell::new(None),
        });
        // Lets callbacks get back from the raw context to this handle.
        unsafe { JS_SetContextOpaque(ptr, Rc::as_ptr(&handle) as *mut c_void) };

        Ok(Context { handle })
    }

    /// Creates a context populated with the builtins enabled in the
    /// runtime's configuration.
    pub fn new(rt: &Runtime) -> Result<Context, Error> {
        let ctx = Context::empty(rt)?;
        builtins::install(&ctx, rt.config().enabled_builtins())?;
        Ok(ctx)
    }

    /// Invokes a function with a new runtime and context.
    pub fn run<R, F>(f: F) -> Result<R, Error>
    where
        F: FnOnce(&Context) -> Result<R, Error>,
    {
        let rt = Runtime::new()?;
        let ctx = Context::new(&rt)?;
        f(&ctx)
    }

    /// Recovers the context that owns a raw pointer handed out by the engine.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live context created through [`Context::empty`].
    pub(crate) unsafe fn from_raw(ptr: *mut JSContext) -> Option<Context> {
        let handle = JS_GetContextOpaque(ptr) as *const ContextHandle;
        if handle.is_null() {
            return None;
        }
        Rc::increment_strong_count(handle);
        Some(Context {
            handle: Rc::from_raw(handle),
        })
    }

    /// Returns a reference to the runtime.
    pub fn rt(&self) -> &Runtime {
        &self.handle.rt
    }

    /// Returns a reference to the root object.
    pub fn global(&self) -> Value {
        // JS_GetGlobalObject already hands out a fresh reference.
        unsafe { Value::from_raw_unchecked(self, JS_GetGlobalObject(self.ptr())) }
    }

    /// Evaluates some code
    pub fn eval(&self, code: &str) -> Result<Value, Error> {
        self.eval_named("<script>", code)
    }

    /// Evaluates some code, reporting `name` as the script name in stacks.
    pub fn eval_named(&self, name: &str, code: &str) -> Result<Value, Error> {
        let input = CString::new(code)?;
        let script_name = CString::new(name)?;
        tracing::trace!(script = name, len = code.len(), "evaluating script");
        unsafe {
            Value::from_raw(
                self,
                JS_Eval(
                    self.ptr(),
                    input.as_ptr(),
                    code.len() as _,
                    script_name.as_ptr(),
                    JS_EVAL_TYPE_GLOBAL as c_int,
                ),
            )
        }
    }

    /// Runs queued jobs (promise reactions) until the queue is empty.
    pub fn execute_pending(&self) -> Result<(), Error> {
        loop {
            let mut job_ctx = ptr::null_mut();
            match unsafe { JS_ExecutePendingJob(self.rt().ptr(), &mut job_ctx) } {
                0 => break Ok(()),
                rv if rv > 0 => (),
                _ => break Err(self.last_error()),
            }
        }
    }

    /// Takes the pending exception out of the engine.
    ///
    /// The thrown value stays with the context until the next exception is
    /// taken, so a callback can rethrow it unchanged.
    pub(crate) fn last_error(&self) -> Error {
        let exc = unsafe { Value::from_raw_unchecked(self, JS_GetException(self.ptr())) };
        let serial = NEXT_THROWN.fetch_add(1, Ordering::Relaxed);
        // Describing the value can throw again, so it is kept only afterwards.
        let described = JsException::from_value(&exc, serial);
        let previous = self.handle.thrown.replace(Some((serial, exc.into_raw())));
        if let Some((_, raw)) = previous {
            unsafe { WL_JS_FreeValue(self.ptr(), raw) };
        }
        Error::JsException(described)
    }

    /// Hands back the value behind `exc` if it is still the last one taken.
    pub(crate) fn take_thrown(&self, exc: &JsException) -> Option<Value> {
        let serial = exc.serial();
        match self.handle.thrown.take() {
            Some((kept, raw)) if kept == serial => {
                Some(unsafe { Value::from_raw_unchecked(self, raw) })
            }
            other => {
                self.handle.thrown.set(other);
                None
            }
        }
    }

    pub(crate) fn ptr(&self) -> *mut JSContext {
        self.handle.ptr
    }
}

impl Drop for ContextHandle {
    fn drop(&mut self) {
        unsafe {
            if let Some((_, raw)) = self.thrown.take() {
                WL_JS_FreeValue(self.ptr, raw);
            }
            JS_SetContextOpaque(self.ptr, ptr::null_mut());
            JS_FreeContext(self.ptr);
        }
    }
}
