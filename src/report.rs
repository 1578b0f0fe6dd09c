//! Result rows and value-list input
//!
//! Helpers for front ends that show raw operation results per address and accept
//! comma-separated values for multi-writes.

use std::fmt;

use crate::bytes::{pack_bits, registers_to_bytes};
use crate::error::{ModbusError, ModbusResult};

/// One decoded point of a read result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRow {
    pub address: u16,
    pub value: u16,
    /// `0x1` for bits, `0x00FF` for registers
    pub hex: String,
    /// `1` for bits, 16 digits for registers
    pub binary: String,
}

impl PointRow {
    fn bit(address: u16, on: bool) -> Self {
        let value = u16::from(on);
        Self {
            address,
            value,
            hex: format!("0x{value:X}"),
            binary: format!("{value:b}"),
        }
    }

    fn register(address: u16, value: u16) -> Self {
        Self {
            address,
            value,
            hex: format!("0x{value:04X}"),
            binary: format!("{value:016b}"),
        }
    }
}

impl fmt::Display for PointRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>5}  {:>5}  {:>6}  {}",
            self.address, self.value, self.hex, self.binary
        )
    }
}

/// Rows for packed coil / discrete-input bytes, one per bit starting at `start`.
///
/// Stops after `quantity` bits, at the end of `bytes`, or at the top of the address
/// space, whichever comes first.
///
/// ```rust
/// use modbus_connector::report::bit_rows;
///
/// let rows = bit_rows(10, 3, &[0b101]);
/// assert_eq!(rows.len(), 3);
/// assert_eq!((rows[1].address, rows[1].value), (11, 0));
/// ```
pub fn bit_rows(start: u16, quantity: u16, bytes: &[u8]) -> Vec<PointRow> {
    let available = bytes.len() * 8;
    (0..usize::from(quantity).min(available))
        .map_while(|i| {
            let address = u16::try_from(i).ok().and_then(|i| start.checked_add(i))?;
            let on = bytes[i / 8] & (1 << (i % 8)) != 0;
            Some(PointRow::bit(address, on))
        })
        .collect()
}

/// Rows for big-endian register bytes, one per complete byte pair starting at `start`.
///
/// A trailing odd byte is ignored.
pub fn register_rows(start: u16, bytes: &[u8]) -> Vec<PointRow> {
    bytes
        .chunks_exact(2)
        .enumerate()
        .map_while(|(i, pair)| {
            let address = u16::try_from(i).ok().and_then(|i| start.checked_add(i))?;
            Some(PointRow::register(
                address,
                u16::from_be_bytes([pair[0], pair[1]]),
            ))
        })
        .collect()
}

/// Parse `"1, 0, 1"` into values.
///
/// Empty tokens (e.g. a trailing comma) are skipped; any other token that is not a
/// 16-bit unsigned integer is an error, as is a list with no values.
///
/// ```rust
/// use modbus_connector::report::parse_value_list;
///
/// assert_eq!(parse_value_list("100, 200,300").unwrap(), vec![100, 200, 300]);
/// assert!(parse_value_list("1, x").is_err());
/// ```
pub fn parse_value_list(input: &str) -> ModbusResult<Vec<u16>> {
    let values = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<u16>().map_err(|e| {
                ModbusError::invalid_data(format!("invalid value {token:?}: {e}"))
            })
        })
        .collect::<ModbusResult<Vec<u16>>>()?;

    if values.is_empty() {
        return Err(ModbusError::invalid_data("no values given"));
    }
    Ok(values)
}

/// Number of values as a request quantity
pub fn quantity_of<T>(values: &[T]) -> ModbusResult<u16> {
    u16::try_from(values.len())
        .map_err(|_| ModbusError::invalid_data(format!("too many values ({})", values.len())))
}

/// Payload for `write_multiple_coils`: non-zero values are ON
pub fn coil_payload(values: &[u16]) -> Vec<u8> {
    let bits: Vec<bool> = values.iter().map(|&v| v != 0).collect();
    pack_bits(&bits)
}

/// Payload for `write_multiple_registers`
pub fn register_payload(values: &[u16]) -> Vec<u8> {
    registers_to_bytes(values)
}
