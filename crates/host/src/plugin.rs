use std::io::{self, Cursor};

use wasi_common::pipe::{ReadPipe, WritePipe};
use wasi_common::sync::WasiCtxBuilder;
use wasi_common::{I32Exit, WasiCtx};
use wasmtime::{Engine, Linker, Module, Store};
use wl_bridge::{Error as BridgeError, ErrorKind, Request, Response};

use crate::error::HostError;
use crate::logs::{self, LogWriter};
use crate::HostConfig;

pub(crate) struct StoreContext {
    wasi: WasiCtx,
    logs: WritePipe<LogWriter>,
    output: WritePipe<Cursor<Vec<u8>>>,
}

impl StoreContext {
    fn new(capacity: usize, input: &[u8]) -> Self {
        let output = WritePipe::new_in_memory();
        let logs = WritePipe::new(LogWriter::new(capacity));
        let wasi = WasiCtxBuilder::new()
            .stdin(Box::new(ReadPipe::from(input)))
            .stdout(Box::new(output.clone()))
            .stderr(Box::new(logs.clone()))
            .build();

        Self { wasi, logs, output }
    }

    pub(crate) fn wasi(&mut self) -> &mut WasiCtx {
        &mut self.wasi
    }

    /// Tears the WASI context down and hands back what the plugin wrote.
    fn into_streams(self) -> Result<(Vec<u8>, LogWriter), HostError> {
        let StoreContext { wasi, logs, output } = self;
        drop(wasi);
        let logs = logs
            .try_into_inner()
            .map_err(|_| still_shared("stderr"))?;
        let output = output
            .try_into_inner()
            .map_err(|_| still_shared("stdout"))?
            .into_inner();
        Ok((output, logs))
    }
}

fn still_shared(stream: &str) -> HostError {
    HostError::BridgeIoError(io::Error::other(format!(
        "plugin {stream} is still referenced"
    )))
}

/// A compiled plugin module.
///
/// Every invocation runs in a fresh store, so plugins keep no state between
/// requests.
pub struct Plugin {
    engine: Engine,
    linker: Linker<StoreContext>,
    module: Module,
    config: HostConfig,
}

impl Plugin {
    pub(crate) fn new(
        engine: Engine,
        mut linker: Linker<StoreContext>,
        module: Module,
        config: HostConfig,
    ) -> Result<Plugin, HostError> {
        if module.get_export(&config.export).is_none() {
            return Err(HostError::MissingExport(config.export.clone()));
        }
        linker
            .define_unknown_imports_as_traps(&module)
            .map_err(HostError::WasmModuleLinkingFailed)?;
        Ok(Plugin {
            engine,
            linker,
            module,
            config,
        })
    }

    /// Name of the export that handles requests.
    pub fn export(&self) -> &str {
        &self.config.export
    }

    /// Sends a request to the plugin and waits for its response.
    ///
    /// The request is fed to the plugin on stdin and the response is read
    /// from its stdout. Fire-and-forget requests return `None` and whatever
    /// the plugin printed is discarded.
    pub fn invoke(&self, request: &Request) -> Result<Option<Response>, HostError> {
        let input = request.serialize().map_err(HostError::ProtocolError)?;
        tracing::debug!(
            id = %request.id(),
            endpoint = request.endpoint(),
            bytes = input.len(),
            "invoking plugin"
        );

        let mut store = Store::new(
            &self.engine,
            StoreContext::new(self.config.log_capacity, &input),
        );
        if let Some(fuel) = self.config.fuel {
            store
                .set_fuel(fuel)
                .map_err(HostError::WasmInvokeFailed)?;
        }

        let call_result = self.call(&mut store);
        if let Some(fuel) = self.config.fuel {
            if let Ok(remaining) = store.get_fuel() {
                tracing::debug!(consumed = fuel - remaining, "plugin fuel usage");
            }
        }

        let (output, logs) = store.into_data().into_streams()?;
        logs::emit(request.endpoint(), &logs);
        call_result?;

        if request.fire_and_forget() {
            if !output.is_empty() {
                tracing::debug!(
                    bytes = output.len(),
                    "ignoring output of fire-and-forget request"
                );
            }
            return Ok(None);
        }

        if output.is_empty() {
            return Err(HostError::ProtocolError(BridgeError::new(
                ErrorKind::InternalError,
                "plugin did not write a response",
            )));
        }
        let response = Response::deserialize(&output).map_err(HostError::ProtocolError)?;
        if response.request_id() != request.id() {
            return Err(HostError::ProtocolError(BridgeError::new(
                ErrorKind::InternalError,
                format!(
                    "response belongs to request {} instead of {}",
                    response.request_id(),
                    request.id()
                ),
            )));
        }
        Ok(Some(response))
    }

    fn call(&self, store: &mut Store<StoreContext>) -> Result<(), HostError> {
        let instance = self
            .linker
            .instantiate(&mut *store, &self.module)
            .map_err(HostError::WasmModuleLinkingFailed)?;

        // WASI reactors expect `_initialize` before anything else.
        if let Some(init) = instance.get_func(&mut *store, "_initialize") {
            let init = init
                .typed::<(), ()>(&*store)
                .map_err(HostError::WasmInvokeFailed)?;
            finish(init.call(&mut *store, ()))?;
        }

        let handle = instance
            .get_func(&mut *store, &self.config.export)
            .ok_or_else(|| HostError::MissingExport(self.config.export.clone()))?
            .typed::<(), ()>(&*store)
            .map_err(HostError::WasmInvokeFailed)?;
        finish(handle.call(&mut *store, ()))
    }
}

/// `proc_exit(0)` unwinds as an error but is a regular way to finish.
fn finish(result: anyhow::Result<()>) -> Result<(), HostError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if matches!(err.downcast_ref::<I32Exit>(), Some(I32Exit(0))) => Ok(()),
        Err(err) => Err(HostError::WasmInvokeFailed(err)),
    }
}
