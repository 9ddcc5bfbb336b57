use bitflags::bitflags;

bitflags! {
    /// Globals installed by [`Context::new`](crate::Context::new).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Builtins: u32 {
        /// `console.log` and `console.error`.
        const CONSOLE = 1;
        /// `VERSION` and `getVersion()`.
        const VERSION = 1 << 1;
    }
}

/// A configuration for [`Runtime`](crate::Runtime).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) memory_limit: Option<usize>,
    pub(crate) max_stack_size: Option<usize>,
    pub(crate) gc_threshold: Option<usize>,
    pub(crate) builtins: Builtins,
}

impl Default for Config {
    /// Creates a [`Config`] with no engine limits and every builtin enabled.
    fn default() -> Self {
        Self {
            memory_limit: None,
            max_stack_size: None,
            gc_threshold: None,
            builtins: Builtins::all(),
        }
    }
}

impl Config {
    /// Caps the memory the engine may allocate, in bytes.
    pub fn memory_limit(&mut self, bytes: usize) -> &mut Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Caps the native stack the interpreter may use, in bytes.
    pub fn max_stack_size(&mut self, bytes: usize) -> &mut Self {
        self.max_stack_size = Some(bytes);
        self
    }

    /// Number of allocated bytes that triggers a garbage collection cycle.
    pub fn gc_threshold(&mut self, bytes: usize) -> &mut Self {
        self.gc_threshold = Some(bytes);
        self
    }

    /// Enables or disables the `console` global.
    pub fn console(&mut self, enabled: bool) -> &mut Self {
        self.builtins.set(Builtins::CONSOLE, enabled);
        self
    }

    /// Enables or disables the `VERSION` and `getVersion` globals.
    pub fn version_globals(&mut self, enabled: bool) -> &mut Self {
        self.builtins.set(Builtins::VERSION, enabled);
        self
    }

    /// Replaces the whole set of builtins.
    pub fn builtins(&mut self, builtins: Builtins) -> &mut Self {
        self.builtins = builtins;
        self
    }

    /// The builtins a primed context receives.
    pub fn enabled_builtins(&self) -> Builtins {
        self.builtins
    }
}

#[cfg(test)]
mod tests {
    use super::{Builtins, Config};

    #[test]
    fn test_defaults_enable_all_builtins() {
        let config = Config::default();
        assert_eq!(config.enabled_builtins(), Builtins::all());
        assert!(config.memory_limit.is_none());
    }

    #[test]
    fn test_toggling_builtins() {
        let mut config = Config::default();
        config.console(false);
        assert_eq!(config.enabled_builtins(), Builtins::VERSION);
        config.version_globals(false).console(true);
        assert_eq!(config.enabled_builtins(), Builtins::CONSOLE);
    }
}
