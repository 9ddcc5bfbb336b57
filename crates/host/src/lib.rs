//! Loads wl plugins into wasmtime and exchanges bridge messages with them.
//!
//! A plugin is a WASI preview 1 module exporting a `() -> ()` handler
//! (`wl_bridge_handle` by default). For every request the handler reads a
//! CBOR encoded [`wl_bridge::Request`] from stdin and writes the CBOR encoded
//! [`wl_bridge::Response`] to stdout. Anything written to stderr shows up as
//! `tracing` events under the `wl_host::plugin` target.

mod error;
mod logs;
mod plugin;

use std::path::Path;

use wasmtime::{Config, Engine, Linker, Module, OptLevel};

pub use crate::error::HostError;
pub use crate::plugin::Plugin;
use crate::plugin::StoreContext;

/// The export invoked when no other one is configured.
pub const DEFAULT_EXPORT: &str = "wl_bridge_handle";

/// Settings shared by every plugin a [`Host`] loads.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Name of the exported handler function.
    pub export: String,
    /// Fuel granted to each invocation; `None` means unlimited.
    pub fuel: Option<u64>,
    /// Bytes of plugin stderr kept per invocation.
    pub log_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            export: DEFAULT_EXPORT.to_string(),
            fuel: None,
            log_capacity: 1024 * 1024,
        }
    }
}

/// Owns the wasmtime engine and the WASI linker plugins are loaded with.
pub struct Host {
    engine: Engine,
    linker: Linker<StoreContext>,
    config: HostConfig,
}

impl Host {
    pub fn new(config: HostConfig) -> Result<Host, HostError> {
        let mut engine_config = Config::new();
        engine_config.cranelift_opt_level(OptLevel::SpeedAndSize);
        engine_config.consume_fuel(config.fuel.is_some());
        let engine = Engine::new(&engine_config).map_err(HostError::EngineSetupFailed)?;

        let mut linker = Linker::new(&engine);
        wasi_common::sync::add_to_linker(&mut linker, |ctx: &mut StoreContext| ctx.wasi())
            .map_err(HostError::EngineSetupFailed)?;

        Ok(Host {
            engine,
            linker,
            config,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Loads a plugin from a `.wasm` or `.wat` file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Plugin, HostError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading plugin");
        let module =
            Module::from_file(&self.engine, path).map_err(HostError::WasmModuleLoadFailed)?;
        self.instantiate(module)
    }

    /// Loads a plugin from WASM bytes or WAT text.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Plugin, HostError> {
        let module = Module::new(&self.engine, bytes).map_err(HostError::WasmModuleLoadFailed)?;
        self.instantiate(module)
    }

    fn instantiate(&self, module: Module) -> Result<Plugin, HostError> {
        Plugin::new(
            self.engine.clone(),
            self.linker.clone(),
            module,
            self.config.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Host, HostConfig, HostError, DEFAULT_EXPORT};

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.export, DEFAULT_EXPORT);
        assert_eq!(config.fuel, None);
        assert_eq!(config.log_capacity, 1 << 20);
    }

    #[test]
    fn test_invalid_modules_fail_to_load() -> Result<(), HostError> {
        let host = Host::new(HostConfig::default())?;
        assert!(matches!(
            host.load_bytes(b"definitely not wasm"),
            Err(HostError::WasmModuleLoadFailed(_))
        ));
        assert!(matches!(
            host.load_file("does/not/exist.wasm"),
            Err(HostError::WasmModuleLoadFailed(_))
        ));
        Ok(())
    }

    #[test]
    fn test_modules_without_the_export_are_rejected() -> Result<(), HostError> {
        let host = Host::new(HostConfig::default())?;
        let err = host
            .load_bytes(br#"(module (func (export "something_else")))"#)
            .err();
        assert!(matches!(err, Some(HostError::MissingExport(name)) if name == DEFAULT_EXPORT));
        Ok(())
    }
}
