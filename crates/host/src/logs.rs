use std::cmp;
use std::io::{self, Write};

/// Collects what a plugin writes to stderr, up to a fixed capacity.
///
/// Output past the capacity is dropped while still being reported as
/// written, so a chatty plugin never sees a failing stderr.
#[derive(Debug)]
pub(crate) struct LogWriter {
    pub(crate) buffer: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl LogWriter {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::new(),
            capacity,
            truncated: false,
        }
    }

    pub(crate) fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let available_capacity = self.capacity - self.buffer.len();
        let amount_to_take = cmp::min(available_capacity, buf.len());
        self.buffer.extend_from_slice(&buf[..amount_to_take]);
        if amount_to_take < buf.len() {
            self.truncated = true;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Re-emits captured plugin output line by line through `tracing`.
pub(crate) fn emit(endpoint: &str, logs: &LogWriter) {
    for line in String::from_utf8_lossy(&logs.buffer).lines() {
        tracing::info!(target: "wl_host::plugin", endpoint, "{line}");
    }
    if logs.truncated() {
        tracing::warn!(
            target: "wl_host::plugin",
            endpoint,
            "plugin output exceeded the log capacity and was truncated"
        );
    }
}
