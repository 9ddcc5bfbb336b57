use std::fmt;
use std::rc::Rc;

use wl_quickjs_sys::{
    JSRuntime, JS_FreeRuntime, JS_NewRuntime, JS_RunGC, JS_SetGCThreshold, JS_SetMaxStackSize,
    JS_SetMemoryLimit,
};

use crate::config::Config;
use crate::error::Error;

/// Wraps a QuickJS runtime.
///
/// Cloning is cheap and shares the underlying runtime, which is freed once
/// the last handle (including the ones held by contexts) goes away.
#[derive(Clone)]
pub struct Runtime {
    handle: Rc<RuntimeHandle>,
}

struct RuntimeHandle {
    ptr: *mut JSRuntime,
    config: Config,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.handle.config)
            .finish()
    }
}

impl Runtime {
    /// Creates a runtime with the default [`Config`].
    pub fn new() -> Result<Runtime, Error> {
        Runtime::with_config(&Config::default())
    }

    /// Creates a runtime and applies the engine limits from `config`.
    pub fn with_config(config: &Config) -> Result<Runtime, Error> {
        let ptr = unsafe { JS_NewRuntime() };
        if ptr.is_null() {
            return Err(Error::RuntimeInit);
        }

        unsafe {
            if let Some(limit) = config.memory_limit {
                JS_SetMemoryLimit(ptr, limit as _);
            }
            if let Some(size) = config.max_stack_size {
                JS_SetMaxStackSize(ptr, size as _);
            }
            if let Some(threshold) = config.gc_threshold {
                JS_SetGCThreshold(ptr, threshold as _);
            }
        }
        tracing::debug!(?config, "created quickjs runtime");

        Ok(Runtime {
            handle: Rc::new(RuntimeHandle {
                ptr,
                config: config.clone(),
            }),
        })
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Forces a garbage collection cycle.
    pub fn run_gc(&self) {
        unsafe { JS_RunGC(self.ptr()) }
    }

    pub(crate) fn ptr(&self) -> *mut JSRuntime {
        self.handle.ptr
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        tracing::trace!("freeing quickjs runtime");
        unsafe { JS_FreeRuntime(self.ptr) }
    }
}
