//! # Modbus Data Packing
//!
//! Conversions between native Modbus values and the byte layout of the PDU.
//!
//! ## Bit packing (coils, discrete inputs)
//!
//! N booleans occupy `ceil(N / 8)` bytes. Bit `i` of the sequence is bit `i % 8`
//! (LSB first) of byte `i / 8`; unused high bits of the last byte are zero.
//!
//! ```text
//! [true, false, true, true, false, false, false, false, true]
//!   -> [0b0000_1101, 0b0000_0001]
//! ```
//!
//! ## Word packing (registers)
//!
//! Each 16-bit register is two bytes, most significant byte first, in address order.
//!
//! The `unpack_*`/`bytes_to_*` decoders are tolerant: anything missing from the input
//! decodes as OFF / zero. They never read past the end of the input slice.

use crate::constants::{COIL_OFF, COIL_ON};

/// Number of bytes needed to hold `quantity` packed bits.
#[inline]
pub fn packed_len(quantity: usize) -> usize {
    quantity.div_ceil(8)
}

/// Pack booleans LSB-first into bytes.
///
/// # Example
///
/// ```rust
/// use modbus_connector::bytes::pack_bits;
///
/// assert_eq!(pack_bits(&[true, false, true]), vec![0b101]);
/// assert_eq!(pack_bits(&[false; 9]), vec![0, 0]);
/// ```
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; packed_len(bits.len())];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpack `quantity` booleans from LSB-first packed bytes.
///
/// Bits beyond the end of `bytes` read as `false`.
///
/// # Example
///
/// ```rust
/// use modbus_connector::bytes::unpack_bits;
///
/// assert_eq!(unpack_bits(&[0b101], 3), vec![true, false, true]);
/// // Payload shorter than the quantity
/// assert_eq!(unpack_bits(&[0xFF], 10)[8..], [false, false]);
/// ```
pub fn unpack_bits(bytes: &[u8], quantity: usize) -> Vec<bool> {
    (0..quantity)
        .map(|i| {
            bytes
                .get(i / 8)
                .is_some_and(|byte| byte & (1 << (i % 8)) != 0)
        })
        .collect()
}

/// Encode registers as big-endian bytes.
///
/// # Example
///
/// ```rust
/// use modbus_connector::bytes::registers_to_bytes;
///
/// assert_eq!(registers_to_bytes(&[0x1234, 0x00FF]), vec![0x12, 0x34, 0x00, 0xFF]);
/// ```
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|r| r.to_be_bytes()).collect()
}

/// Decode `quantity` big-endian registers.
///
/// A register whose two bytes are not both present decodes as `0`.
///
/// # Example
///
/// ```rust
/// use modbus_connector::bytes::bytes_to_registers;
///
/// assert_eq!(bytes_to_registers(&[0x30, 0x39], 1), vec![12345]);
/// // Odd trailing byte
/// assert_eq!(bytes_to_registers(&[0x00, 0x01, 0x02], 2), vec![1, 0]);
/// ```
pub fn bytes_to_registers(bytes: &[u8], quantity: usize) -> Vec<u16> {
    (0..quantity)
        .map(|i| match (bytes.get(i * 2), bytes.get(i * 2 + 1)) {
            (Some(&hi), Some(&lo)) => u16::from_be_bytes([hi, lo]),
            _ => 0,
        })
        .collect()
}

/// Interpret a single-coil wire value.
///
/// Returns `None` for anything other than `0xFF00` / `0x0000`.
#[inline]
pub fn coil_from_u16(value: u16) -> Option<bool> {
    match value {
        COIL_ON => Some(true),
        COIL_OFF => Some(false),
        _ => None,
    }
}

/// Wire value of a single coil.
#[inline]
pub fn coil_to_u16(value: bool) -> u16 {
    if value {
        COIL_ON
    } else {
        COIL_OFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pack_bits_lsb_first() {
        let bits = [true, false, true, true, false, false, false, false, true];
        assert_eq!(pack_bits(&bits), vec![0b0000_1101, 0b0000_0001]);
        assert!(pack_bits(&[]).is_empty());
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(1), 1);
        assert_eq!(packed_len(8), 1);
        assert_eq!(packed_len(9), 2);
        assert_eq!(packed_len(2000), 250);
    }

    #[test]
    fn test_unpack_bits_tolerates_short_payload() {
        assert_eq!(unpack_bits(&[], 4), vec![false; 4]);
        let bits = unpack_bits(&[0b1000_0001], 12);
        assert_eq!(bits.len(), 12);
        assert!(bits[0]);
        assert!(bits[7]);
        assert!(bits[8..].iter().all(|b| !b));
    }

    #[test]
    fn test_unpack_bits_ignores_extra_bits() {
        // Only the first three bits are requested
        assert_eq!(unpack_bits(&[0xFF, 0xFF], 3), vec![true, true, true]);
    }

    #[test]
    fn test_registers_big_endian() {
        assert_eq!(registers_to_bytes(&[12345]), vec![0x30, 0x39]);
        assert_eq!(bytes_to_registers(&[0x30, 0x39], 1), vec![12345]);
    }

    #[test]
    fn test_bytes_to_registers_tolerates_short_payload() {
        assert_eq!(bytes_to_registers(&[], 2), vec![0, 0]);
        assert_eq!(bytes_to_registers(&[0xAB], 1), vec![0]);
        assert_eq!(bytes_to_registers(&[0x00, 0x64, 0x00], 3), vec![100, 0, 0]);
    }

    #[test]
    fn test_coil_values() {
        assert_eq!(coil_from_u16(0xFF00), Some(true));
        assert_eq!(coil_from_u16(0x0000), Some(false));
        assert_eq!(coil_from_u16(0x0001), None);
        assert_eq!(coil_from_u16(0x00FF), None);
        assert_eq!(coil_to_u16(true), 0xFF00);
        assert_eq!(coil_to_u16(false), 0x0000);
    }

    proptest! {
        #[test]
        fn prop_bits_round_trip(bits in proptest::collection::vec(any::<bool>(), 0..2100)) {
            let packed = pack_bits(&bits);
            prop_assert_eq!(packed.len(), packed_len(bits.len()));
            prop_assert_eq!(unpack_bits(&packed, bits.len()), bits);
        }

        #[test]
        fn prop_registers_round_trip(regs in proptest::collection::vec(any::<u16>(), 0..130)) {
            let bytes = registers_to_bytes(&regs);
            prop_assert_eq!(bytes.len(), regs.len() * 2);
            prop_assert_eq!(bytes_to_registers(&bytes, regs.len()), regs);
        }

        #[test]
        fn prop_tolerant_decoders_never_overrun(
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            quantity in 0usize..600,
        ) {
            prop_assert_eq!(unpack_bits(&payload, quantity).len(), quantity);
            prop_assert_eq!(bytes_to_registers(&payload, quantity).len(), quantity);
        }
    }
}
