use thiserror::Error;

/// Errors raised while loading or invoking a plugin.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("WASM engine setup failed")]
    EngineSetupFailed(#[source] anyhow::Error),
    #[error("WASM module load failed")]
    WasmModuleLoadFailed(#[source] anyhow::Error),
    #[error("WASM module linking failed")]
    WasmModuleLinkingFailed(#[source] anyhow::Error),
    #[error("WASM invocation failed")]
    WasmInvokeFailed(#[source] anyhow::Error),
    #[error("plugin does not export `{0}`")]
    MissingExport(String),
    #[error("protocol error")]
    ProtocolError(#[source] wl_bridge::Error),
    #[error("bridge i/o error")]
    BridgeIoError(#[source] std::io::Error),
}
