//! Modbus function catalog and protocol helpers
//!
//! [`ModbusFunction`] lists every function code the controller knows about, including
//! the ones it deliberately does not implement. Those stay named variants so a caller
//! gets a precise [`ModbusError::Unsupported`](crate::ModbusError::Unsupported) instead
//! of a generic failure.

use std::fmt;

use crate::constants::*;

/// Modbus slave/unit identifier
pub type SlaveId = u8;

/// Default unit identifier used when none is configured
pub const DEFAULT_SLAVE_ID: SlaveId = 1;

/// Modbus function codes known to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusFunction {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
    MaskWriteRegister,
    ReadWriteMultipleRegisters,
    ReadFifoQueue,
}

impl ModbusFunction {
    /// All known functions in function-code order
    pub const ALL: [ModbusFunction; 11] = [
        Self::ReadCoils,
        Self::ReadDiscreteInputs,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleCoil,
        Self::WriteSingleRegister,
        Self::WriteMultipleCoils,
        Self::WriteMultipleRegisters,
        Self::MaskWriteRegister,
        Self::ReadWriteMultipleRegisters,
        Self::ReadFifoQueue,
    ];

    /// Wire function code
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ReadCoils => FC_READ_COILS,
            Self::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
            Self::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            Self::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleCoils => FC_WRITE_MULTIPLE_COILS,
            Self::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
            Self::MaskWriteRegister => FC_MASK_WRITE_REGISTER,
            Self::ReadWriteMultipleRegisters => FC_READ_WRITE_MULTIPLE_REGISTERS,
            Self::ReadFifoQueue => FC_READ_FIFO_QUEUE,
        }
    }

    /// Look up a function by wire code; the exception bit (0x80) is ignored
    pub fn from_u8(code: u8) -> Option<Self> {
        let code = code & 0x7F;
        Self::ALL.into_iter().find(|f| f.to_u8() == code)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
            Self::MaskWriteRegister => "Mask Write Register",
            Self::ReadWriteMultipleRegisters => "Read/Write Multiple Registers",
            Self::ReadFifoQueue => "Read FIFO Queue",
        }
    }

    /// Whether the controller implements this function
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::MaskWriteRegister | Self::ReadWriteMultipleRegisters | Self::ReadFifoQueue
        )
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Standard description of a Modbus exception code
pub fn exception_description(code: u8) -> &'static str {
    match code {
        EXCEPTION_ILLEGAL_FUNCTION => "Illegal Function",
        EXCEPTION_ILLEGAL_DATA_ADDRESS => "Illegal Data Address",
        EXCEPTION_ILLEGAL_DATA_VALUE => "Illegal Data Value",
        EXCEPTION_SERVER_DEVICE_FAILURE => "Server Device Failure",
        EXCEPTION_ACKNOWLEDGE => "Acknowledge",
        EXCEPTION_SERVER_DEVICE_BUSY => "Server Device Busy",
        EXCEPTION_MEMORY_PARITY_ERROR => "Memory Parity Error",
        EXCEPTION_GATEWAY_PATH_UNAVAILABLE => "Gateway Path Unavailable",
        EXCEPTION_GATEWAY_TARGET_FAILED => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_codes() {
        assert_eq!(ModbusFunction::ReadCoils.to_u8(), 0x01);
        assert_eq!(ModbusFunction::WriteMultipleCoils.to_u8(), 0x0F);
        assert_eq!(ModbusFunction::WriteMultipleRegisters.to_u8(), 0x10);
        assert_eq!(ModbusFunction::ReadFifoQueue.to_u8(), 0x18);
    }

    #[test]
    fn test_from_u8() {
        for function in ModbusFunction::ALL {
            assert_eq!(ModbusFunction::from_u8(function.to_u8()), Some(function));
        }
        // Exception responses carry the high bit
        assert_eq!(
            ModbusFunction::from_u8(0x83),
            Some(ModbusFunction::ReadHoldingRegisters)
        );
        assert_eq!(ModbusFunction::from_u8(0x2B), None);
    }

    #[test]
    fn test_supported_catalog() {
        let unsupported: Vec<_> = ModbusFunction::ALL
            .into_iter()
            .filter(|f| !f.is_supported())
            .collect();
        assert_eq!(
            unsupported,
            vec![
                ModbusFunction::MaskWriteRegister,
                ModbusFunction::ReadWriteMultipleRegisters,
                ModbusFunction::ReadFifoQueue,
            ]
        );
    }

    #[test]
    fn test_exception_description() {
        assert_eq!(exception_description(0x01), "Illegal Function");
        assert_eq!(exception_description(0x0B), "Gateway Target Device Failed to Respond");
        assert_eq!(exception_description(0x7F), "Unknown Exception");
    }
}
