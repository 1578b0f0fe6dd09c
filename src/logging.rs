//! Transaction logging
//!
//! [`CallbackLogger`] records each request, response and failure. By default the
//! records go to `tracing`; a host application can route them to its own sink
//! (for example an on-screen request/response log) with [`CallbackLogger::new`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::error::ModbusError;
use crate::protocol::ModbusFunction;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        };
        f.write_str(s)
    }
}

/// Host-provided log sink
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Where log records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// Drop everything
    Disabled,
    /// Emit through `tracing`
    #[default]
    Tracing,
    /// Hand records to a [`LogCallback`]
    Callback,
}

/// Transaction logger shared by the controller
#[derive(Clone, Default)]
pub struct CallbackLogger {
    mode: LoggingMode,
    min_level: Option<LogLevel>,
    callback: Option<LogCallback>,
}

impl CallbackLogger {
    /// Logger that forwards records at or above `min_level` to `callback`
    pub fn new(callback: LogCallback, min_level: LogLevel) -> Self {
        Self {
            mode: LoggingMode::Callback,
            min_level: Some(min_level),
            callback: Some(callback),
        }
    }

    /// Logger that emits through `tracing`
    pub fn tracing() -> Self {
        Self::default()
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self {
            mode: LoggingMode::Disabled,
            ..Self::default()
        }
    }

    /// Current mode
    pub fn mode(&self) -> LoggingMode {
        self.mode
    }

    /// Emit one record
    pub fn log(&self, level: LogLevel, message: &str) {
        match self.mode {
            LoggingMode::Disabled => {}
            LoggingMode::Tracing => match level {
                LogLevel::Error => error!("{}", message),
                LogLevel::Warn => warn!("{}", message),
                LogLevel::Info => info!("{}", message),
                LogLevel::Debug => debug!("{}", message),
                LogLevel::Trace => trace!("{}", message),
            },
            LoggingMode::Callback => {
                // Lower severities sort higher (Error < Trace)
                if self.min_level.is_some_and(|min| level > min) {
                    return;
                }
                if let Some(callback) = &self.callback {
                    callback(level, message);
                }
            }
        }
    }

    /// Record an outgoing request
    pub fn log_request(&self, function: ModbusFunction, address: u16, quantity: u16, payload: &[u8]) {
        let message = if payload.is_empty() {
            format!("REQ {function} addr={address} qty={quantity}")
        } else {
            format!(
                "REQ {function} addr={address} qty={quantity} data={}",
                hex_dump(payload)
            )
        };
        self.log(LogLevel::Debug, &message);
    }

    /// Record a decoded response
    pub fn log_response(&self, function: ModbusFunction, data: &[u8]) {
        self.log(
            LogLevel::Debug,
            &format!("RES {function} data={}", hex_dump(data)),
        );
    }

    /// Record a failed transaction
    pub fn log_error(&self, function: ModbusFunction, err: &ModbusError) {
        let level = if err.is_timeout() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        };
        self.log(level, &format!("ERR {function}: {err}"));
    }
}

impl fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLogger")
            .field("mode", &self.mode)
            .field("min_level", &self.min_level)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Space-separated upper-case hex, e.g. `01 FF 00`
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
