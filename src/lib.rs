//! # Modbus Connector - Async Modbus TCP/RTU Master Controller
//!
//! A Modbus master that holds one connection to a slave device and exposes each Modbus
//! function as a byte-oriented operation, the shape a front end (GUI, CLI, scripting
//! bridge) needs to display raw results.
//!
//! ## Features
//!
//! - **Both transports**: Modbus TCP and Modbus RTU over a serial port
//! - **Byte-level results**: packed coil bytes and big-endian register bytes
//! - **Validated requests**: quantity and address-space checks before anything is sent
//! - **Serialized access**: one transaction on the wire at a time, safe to share across tasks
//! - **Transaction log**: request/response/error records to `tracing` or a host callback
//! - **Self-test**: a fixed connect/read/write/verify sequence against a simulator
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Controller |
//! |------|----------|------------|
//! | 0x01 | Read Coils | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ |
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x04 | Read Input Registers | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//! | 0x16 | Mask Write Register | ❌ `Unsupported` |
//! | 0x17 | Read/Write Multiple Registers | ❌ `Unsupported` |
//! | 0x18 | Read FIFO Queue | ❌ `Unsupported` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_connector::{ModbusController, ModbusResult};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let controller = ModbusController::new();
//!     println!("{}", controller.connect_tcp("127.0.0.1:5020").await?);
//!
//!     // 8 coils -> 1 packed byte
//!     let coils = controller.read_coils(0, 8).await?;
//!     println!("Coils: {:08b}", coils[0]);
//!
//!     // 5 registers -> 10 bytes
//!     let registers = controller.read_holding_registers(0, 5).await?;
//!     println!("Registers: {:02X?}", registers);
//!
//!     controller.write_single_register(10, 12345).await?;
//!
//!     println!("{}", controller.disconnect().await);
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Function catalog and exception codes
pub mod protocol;

/// Connection targets and controller settings
pub mod config;

/// Transport traits and the tokio-modbus backend
pub mod transport;

/// The Modbus master controller
pub mod controller;

/// Transaction logging
pub mod logging;

// ============================================================================
// Data handling
// ============================================================================

/// Bit and register packing
pub mod bytes;

/// Device-specific protocol limits configuration
pub mod device_limits;

/// Result rows and value-list input for front ends
pub mod report;


// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime ===
pub use tokio;

// === Controller API ===
pub use controller::{Connected, DisconnectOutcome, ModbusController};

// === Error handling ===
pub use error::{ErrorKind, ModbusError, ModbusResult};

// === Configuration ===
pub use config::{
    CoilValueMode, ConnectionTarget, ControllerConfig, Parity, RtuConfig, TcpConfig,
    TransportKind,
};
pub use device_limits::DeviceLimits;

// === Core types ===
pub use protocol::{ModbusFunction, SlaveId};

// === Transport ===
pub use transport::{
    Connector, ModbusTransport, TokioModbusConnector, TokioModbusTransport, TransportStats,
};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_PDU_SIZE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

// === Logging ===
pub use logging::{CallbackLogger, LogCallback, LogLevel, LoggingMode};

// === Front-end helpers ===
pub use report::{parse_value_list, PointRow};
pub use self_test::{SelfTest, SelfTestReport, StepStatus, TestStep};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Modbus Connector v{} - async Modbus TCP/RTU master", VERSION)
}
