use std::os::raw::{c_int, c_void};
use std::ptr;
use std::vec;

use wl_quickjs_sys::{
    js_free, JSPropertyEnum, JS_AtomToString, JS_FreeAtom, JS_GetOwnPropertyNames,
    JS_GPN_ENUM_ONLY, JS_GPN_STRING_MASK,
};

use crate::error::Error;
use crate::value::Value;

/// Iterator over the own enumerable string keyed properties of an object.
///
/// Keys are collected up front; values are looked up lazily, so a property
/// deleted in between yields `undefined`.
#[derive(Debug)]
pub struct PropertiesIter {
    obj: Value,
    keys: vec::IntoIter<String>,
}

impl PropertiesIter {
    pub(crate) fn new(obj: &Value) -> Result<PropertiesIter, Error> {
        let ctx = obj.ctx();
        let flags = (JS_GPN_STRING_MASK | JS_GPN_ENUM_ONLY) as c_int;
        let mut tab: *mut JSPropertyEnum = ptr::null_mut();
        let mut len = 0;
        let ret = unsafe { JS_GetOwnPropertyNames(ctx.ptr(), &mut tab, &mut len, obj.raw(), flags) };
        if ret < 0 {
            return Err(ctx.last_error());
        }

        let mut keys = Vec::with_capacity(len as usize);
        let mut failure = None;
        for i in 0..len as usize {
            let atom = unsafe { (*tab.add(i)).atom };
            if failure.is_none() {
                match unsafe { Value::from_raw(ctx, JS_AtomToString(ctx.ptr(), atom)) } {
                    Ok(key) => keys.push(key.to_string_lossy()),
                    Err(err) => failure = Some(err),
                }
            }
            unsafe { JS_FreeAtom(ctx.ptr(), atom) };
        }
        unsafe { js_free(ctx.ptr(), tab as *mut c_void) };

        if let Some(err) = failure {
            return Err(err);
        }
        Ok(PropertiesIter {
            obj: obj.clone(),
            keys: keys.into_iter(),
        })
    }
}

impl Iterator for PropertiesIter {
    type Item = Result<(String, Value), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        Some(self.obj.get_property(&key).map(|value| (key, value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Context, ValueKind};
    use anyhow::Result;

    #[test]
    fn test_keys_follow_insertion_order() -> Result<()> {
        Context::run(|ctx| {
            let obj = ctx.eval("({a: 1, b: 'two', c: [1, 2, 3]})")?;
            let props = obj.properties()?.collect::<Result<Vec<_>, _>>()?;
            let keys: Vec<_> = props.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, ["a", "b", "c"]);
            assert_eq!(props[0].1.as_i32(), Some(1));
            assert_eq!(props[1].1.as_string()?, "two");
            assert!(props[2].1.is_array());
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_symbols_and_hidden_properties_are_skipped() -> Result<()> {
        Context::run(|ctx| {
            let obj = ctx.eval(
                "const o = {visible: true, [Symbol('s')]: 1};\
                 Object.defineProperty(o, 'hidden', {value: 2, enumerable: false});\
                 o",
            )?;
            let keys = obj
                .properties()?
                .map(|prop| prop.map(|(k, _)| k))
                .collect::<Result<Vec<_>, _>>()?;
            assert_eq!(keys, ["visible"]);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_array_indices_are_keys() -> Result<()> {
        Context::run(|ctx| {
            let arr = ctx.eval("['x', 'y']")?;
            let props = arr.properties()?.collect::<Result<Vec<_>, _>>()?;
            assert_eq!(props.len(), 2);
            assert_eq!(props[0].0, "0");
            assert_eq!(props[1].1.as_string()?, "y");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_properties_of_primitives_fail() -> Result<()> {
        Context::run(|ctx| {
            let n = ctx.eval("undefined")?;
            assert_eq!(n.kind(), ValueKind::Undefined);
            assert!(n.properties().is_err());
            Ok(())
        })?;
        Ok(())
    }
}
