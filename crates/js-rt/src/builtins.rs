//! Globals installed into primed contexts.

use std::cell::RefCell;
use std::io::{self, Write};

use crate::config::Builtins;
use crate::context::Context;
use crate::error::Error;
use crate::primitive::Primitive;
use crate::value::Value;

pub(crate) fn install(ctx: &Context, builtins: Builtins) -> Result<(), Error> {
    if builtins.contains(Builtins::CONSOLE) {
        register_console(ctx, io::stderr(), io::stderr())?;
    }
    if builtins.contains(Builtins::VERSION) {
        register_version(ctx)?;
    }
    Ok(())
}

/// Installs a `console` global whose `log` and `error` functions write to
/// the given streams.
///
/// Calling it again replaces the previous `console` object.
pub fn register_console<T, U>(ctx: &Context, log_stream: T, error_stream: U) -> Result<(), Error>
where
    T: Write + 'static,
    U: Write + 'static,
{
    let console = Value::new_object(ctx)?;
    console.set_property("log", console_fn(ctx, "log", log_stream)?)?;
    console.set_property("error", console_fn(ctx, "error", error_stream)?)?;
    ctx.global().set_property("console", console)
}

fn console_fn<T: Write + 'static>(ctx: &Context, name: &str, stream: T) -> Result<Value, Error> {
    let stream = RefCell::new(stream);
    Value::from_func(ctx, name, move |ctx, _this, args| {
        let mut stream = stream.borrow_mut();
        log(&mut *stream, args).map_err(|e| Error::Callback(format!("console: {e}")))?;
        Value::from_primitive(ctx, Primitive::Undefined)
    })
}

fn log<T: Write>(stream: &mut T, args: &[Value]) -> io::Result<()> {
    for (i, arg) in args.iter().enumerate() {
        if i != 0 {
            write!(stream, " ")?;
        }
        write!(stream, "{}", arg.to_string_lossy())?;
    }
    writeln!(stream)?;
    stream.flush()
}

fn register_version(ctx: &Context) -> Result<(), Error> {
    let global = ctx.global();
    global.set_property("VERSION", env!("CARGO_PKG_VERSION"))?;
    let get_version = Value::from_func(ctx, "getVersion", |ctx, _this, _args| {
        Value::from_primitive(ctx, env!("CARGO_PKG_VERSION"))
    })?;
    global.set_property("getVersion", get_version)
}
