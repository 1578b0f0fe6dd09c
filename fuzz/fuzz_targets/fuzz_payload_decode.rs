//! Tolerant payload decoders must accept any payload/quantity pair without panicking
//! and always yield exactly `quantity` values.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_connector::bytes::{bytes_to_registers, packed_len, unpack_bits};
use modbus_connector::report::{bit_rows, register_rows};

#[derive(Debug, Arbitrary)]
struct Input {
    start: u16,
    quantity: u16,
    payload: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let quantity = usize::from(input.quantity);

    let bits = unpack_bits(&input.payload, quantity);
    assert_eq!(bits.len(), quantity);

    let registers = bytes_to_registers(&input.payload, quantity);
    assert_eq!(registers.len(), quantity);

    let rows = bit_rows(input.start, input.quantity, &input.payload);
    assert!(rows.len() <= quantity);
    assert!(rows.len() <= input.payload.len() * 8);

    let rows = register_rows(input.start, &input.payload);
    assert!(rows.len() <= input.payload.len() / 2);

    assert!(packed_len(quantity) * 8 >= quantity);
});
