//! # Device Limits Configuration
//!
//! Per-device quantity limits and the validation the controller runs before every
//! dispatch.
//!
//! ## Modbus Specification Limits
//!
//! - **Read Coils/Discrete Inputs (FC01/02)**: 1-2000 bits per request
//! - **Read Holding/Input Registers (FC03/04)**: 1-125 registers per request
//! - **Write Multiple Coils (FC15)**: 1-1968 coils per request
//! - **Write Multiple Registers (FC16)**: 1-123 registers per request
//!
//! Some devices accept less. A [`DeviceLimits`] can lower any limit; values above the
//! specification are clamped back to it.

use crate::constants::{
    ADDRESS_SPACE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::ModbusFunction;

/// Default maximum registers per read operation (Modbus specification).
pub const DEFAULT_MAX_READ_REGISTERS: u16 = MAX_READ_REGISTERS;

/// Default maximum registers per write operation (Modbus specification).
pub const DEFAULT_MAX_WRITE_REGISTERS: u16 = MAX_WRITE_REGISTERS;

/// Default maximum coils per read operation (Modbus specification).
pub const DEFAULT_MAX_READ_COILS: u16 = MAX_READ_COILS;

/// Default maximum coils per write operation (Modbus specification).
pub const DEFAULT_MAX_WRITE_COILS: u16 = MAX_WRITE_COILS;

/// Device-specific Modbus protocol limits.
///
/// # Example
///
/// ```rust
/// use modbus_connector::DeviceLimits;
///
/// // A meter that only answers 50 registers per read
/// let limits = DeviceLimits::new().with_max_read_registers(50);
///
/// assert_eq!(limits.max_read_registers, 50);
/// assert!(limits.validate_read_registers(0, 50).is_ok());
/// assert!(limits.validate_read_registers(0, 51).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum registers per read request.
    pub max_read_registers: u16,
    /// Maximum registers per write request.
    pub max_write_registers: u16,
    /// Maximum coils per read request.
    pub max_read_coils: u16,
    /// Maximum coils per write request.
    pub max_write_coils: u16,
}

impl DeviceLimits {
    /// Create new device limits with default (Modbus spec) values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create limits for a conservative/slow device.
    ///
    /// 50 registers and 500 coils per request in both directions.
    pub fn conservative() -> Self {
        Self {
            max_read_registers: 50,
            max_write_registers: 50,
            max_read_coils: 500,
            max_write_coils: 500,
        }
    }

    /// Set maximum read registers (clamped to 125).
    pub fn with_max_read_registers(mut self, count: u16) -> Self {
        self.max_read_registers = count.min(MAX_READ_REGISTERS);
        self
    }

    /// Set maximum write registers (clamped to 123).
    pub fn with_max_write_registers(mut self, count: u16) -> Self {
        self.max_write_registers = count.min(MAX_WRITE_REGISTERS);
        self
    }

    /// Set maximum read coils (clamped to 2000).
    pub fn with_max_read_coils(mut self, count: u16) -> Self {
        self.max_read_coils = count.min(MAX_READ_COILS);
        self
    }

    /// Set maximum write coils (clamped to 1968).
    pub fn with_max_write_coils(mut self, count: u16) -> Self {
        self.max_write_coils = count.min(MAX_WRITE_COILS);
        self
    }

    /// Quantity limit that applies to `function`, if it carries a quantity.
    pub fn max_quantity(&self, function: ModbusFunction) -> Option<u16> {
        match function {
            ModbusFunction::ReadCoils | ModbusFunction::ReadDiscreteInputs => {
                Some(self.max_read_coils)
            }
            ModbusFunction::ReadHoldingRegisters | ModbusFunction::ReadInputRegisters => {
                Some(self.max_read_registers)
            }
            ModbusFunction::WriteMultipleCoils => Some(self.max_write_coils),
            ModbusFunction::WriteMultipleRegisters => Some(self.max_write_registers),
            _ => None,
        }
    }

    /// Validate a request's address and quantity for `function`.
    ///
    /// Checks `1 <= quantity <= limit` and that the range stays inside the
    /// 16-bit address space. Functions without a quantity only get the address check.
    pub fn validate(&self, function: ModbusFunction, address: u16, quantity: u16) -> ModbusResult<()> {
        if let Some(max) = self.max_quantity(function) {
            if quantity == 0 || quantity > max {
                return Err(ModbusError::invalid_data(format!(
                    "{function}: quantity {quantity} out of range (1-{max})"
                )));
            }
        }

        if u32::from(address) + u32::from(quantity) > ADDRESS_SPACE {
            return Err(ModbusError::invalid_data(format!(
                "{function}: address {address} + quantity {quantity} exceeds the address space"
            )));
        }

        Ok(())
    }

    /// Validate a FC01/FC02 request.
    pub fn validate_read_bits(&self, address: u16, quantity: u16) -> ModbusResult<()> {
        self.validate(ModbusFunction::ReadCoils, address, quantity)
    }

    /// Validate a FC03/FC04 request.
    pub fn validate_read_registers(&self, address: u16, quantity: u16) -> ModbusResult<()> {
        self.validate(ModbusFunction::ReadHoldingRegisters, address, quantity)
    }

    /// Validate a FC15 request.
    pub fn validate_write_coils(&self, address: u16, quantity: u16) -> ModbusResult<()> {
        self.validate(ModbusFunction::WriteMultipleCoils, address, quantity)
    }

    /// Validate a FC16 request.
    pub fn validate_write_registers(&self, address: u16, quantity: u16) -> ModbusResult<()> {
        self.validate(ModbusFunction::WriteMultipleRegisters, address, quantity)
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_read_registers: DEFAULT_MAX_READ_REGISTERS,
            max_write_registers: DEFAULT_MAX_WRITE_REGISTERS,
            max_read_coils: DEFAULT_MAX_READ_COILS,
            max_write_coils: DEFAULT_MAX_WRITE_COILS,
        }
    }
}
