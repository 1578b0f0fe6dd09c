//! Value-list parsing returns an error for bad input, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_connector::report::parse_value_list;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(values) = parse_value_list(text) {
            assert!(!values.is_empty());
            assert!(values.len() <= text.split(',').count());
        }
    }
});
