//! Module log forwarding
//!
//! The module logs by writing UTF-8 bytes into its own memory and calling the
//! host's `logWasm(offset, length)` import. The bytes are decoded on the spot
//! and never referenced again after the call returns.

use crate::bridge::LinearMemory;
use crate::error::{DecodeWarning, LayoutError};

/// Log target used for messages coming from the module
pub const MODULE_LOG_TARGET: &str = "ballpit::module";

/// A decoded module log message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub text: String,
    /// Present when the bytes were not valid UTF-8
    pub warning: Option<DecodeWarning>,
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD
pub fn decode_message(bytes: &[u8]) -> LogMessage {
    match std::str::from_utf8(bytes) {
        Ok(text) => LogMessage {
            text: text.to_owned(),
            warning: None,
        },
        Err(e) => LogMessage {
            text: String::from_utf8_lossy(bytes).into_owned(),
            warning: Some(DecodeWarning {
                valid_up_to: e.valid_up_to(),
            }),
        },
    }
}

/// Forwards module log messages to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticsSink;

impl DiagnosticsSink {
    /// Handle one `logWasm(offset, length)` call
    pub fn log<M: LinearMemory + ?Sized>(
        &self,
        memory: &M,
        offset: u32,
        length: u32,
    ) -> Result<LogMessage, LayoutError> {
        let message = match memory.read(offset as usize, length as usize) {
            Ok(bytes) => decode_message(&bytes),
            Err(e) => {
                log::error!(target: MODULE_LOG_TARGET, "Dropped log message: {}", e);
                return Err(e);
            }
        };

        if let Some(warning) = message.warning {
            log::warn!(target: MODULE_LOG_TARGET, "{}", warning);
        }
        log::info!(target: MODULE_LOG_TARGET, "{}", message.text);
        Ok(message)
    }
}
