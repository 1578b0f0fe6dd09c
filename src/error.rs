//! Error types for the Modbus controller
//!
//! Every failure the controller can produce is a [`ModbusError`]. Callers that need to
//! branch on the failure class use [`ModbusError::kind`] instead of matching on text.

use thiserror::Error;

use crate::protocol::{exception_description, ModbusFunction};

/// Result type used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Coarse failure classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An operation was attempted with no open connection.
    NotConnected,
    /// Opening the transport failed.
    ConnectFailure,
    /// A dispatched request failed (I/O, timeout, exception response, malformed response).
    TransactionFailure,
    /// The function code is intentionally not implemented.
    Unsupported,
    /// An argument was outside the range the protocol allows.
    ValidationFailure,
}

/// Errors produced by the controller and its transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// No active connection
    #[error("client not connected")]
    NotConnected,

    /// Transport could not be opened
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// I/O failure on an open transport
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Transaction did not complete in time
    #[error("Timeout: {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Slave answered with an exception response
    #[error("Modbus exception: {function} returned code 0x{code:02X} ({})", exception_description(*.code))]
    Exception { function: ModbusFunction, code: u8 },

    /// Response did not match the request
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Function code is deliberately not implemented
    #[error("{function} (0x{:02X}) is not supported", .function.to_u8())]
    Unsupported { function: ModbusFunction },

    /// Argument out of range
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Connection parameters rejected before any I/O
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ModbusError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an exception error from a slave exception code
    pub fn exception(function: ModbusFunction, code: u8) -> Self {
        Self::Exception { function, code }
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an unsupported-function error
    pub fn unsupported(function: ModbusFunction) -> Self {
        Self::Unsupported { function }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Connection { .. } => ErrorKind::ConnectFailure,
            Self::Io { .. } | Self::Timeout { .. } | Self::Exception { .. } | Self::Protocol { .. } => {
                ErrorKind::TransactionFailure
            }
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::InvalidData { .. } | Self::Configuration { .. } => ErrorKind::ValidationFailure,
        }
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether repeating the same call on the same connection could succeed.
    ///
    /// Timeouts and the "busy"/"acknowledge" exceptions are transient. Everything else
    /// needs a different argument or a new connection.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Exception { code, .. } => matches!(
                *code,
                crate::constants::EXCEPTION_ACKNOWLEDGE | crate::constants::EXCEPTION_SERVER_DEVICE_BUSY
            ),
            _ => false,
        }
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            return Self::timeout("I/O", 0);
        }
        Self::io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ModbusError::NotConnected.kind(), ErrorKind::NotConnected);
        assert_eq!(
            ModbusError::connection("refused").kind(),
            ErrorKind::ConnectFailure
        );
        assert_eq!(
            ModbusError::timeout("read coils", 1000).kind(),
            ErrorKind::TransactionFailure
        );
        assert_eq!(
            ModbusError::exception(ModbusFunction::ReadCoils, 2).kind(),
            ErrorKind::TransactionFailure
        );
        assert_eq!(
            ModbusError::unsupported(ModbusFunction::ReadFifoQueue).kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(
            ModbusError::invalid_data("quantity").kind(),
            ErrorKind::ValidationFailure
        );
        assert_eq!(
            ModbusError::configuration("parity").kind(),
            ErrorKind::ValidationFailure
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ModbusError::NotConnected.to_string(), "client not connected");

        let err = ModbusError::exception(ModbusFunction::ReadHoldingRegisters, 0x02);
        assert_eq!(
            err.to_string(),
            "Modbus exception: Read Holding Registers returned code 0x02 (Illegal Data Address)"
        );

        let err = ModbusError::unsupported(ModbusFunction::MaskWriteRegister);
        assert_eq!(err.to_string(), "Mask Write Register (0x16) is not supported");
    }

    #[test]
    fn test_recoverable() {
        assert!(ModbusError::timeout("read", 10).is_recoverable());
        assert!(ModbusError::exception(ModbusFunction::ReadCoils, 0x06).is_recoverable());
        assert!(!ModbusError::exception(ModbusFunction::ReadCoils, 0x02).is_recoverable());
        assert!(!ModbusError::NotConnected.is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let err: ModbusError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer").into();
        assert_eq!(err.kind(), ErrorKind::TransactionFailure);
        assert!(!err.is_timeout());

        let err: ModbusError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(err.is_timeout());
        assert_eq!(
            err,
            ModbusError::Timeout {
                operation: "I/O".to_string(),
                timeout_ms: 0
            }
        );
    }
}
