// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for segment file name parsing

#![no_main]

use libfuzzer_sys::fuzz_target;
use tidemark_journal::{decode_file_name, encode_file_name, UNKNOWN_SEQUENCE_NUMBER};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Accepted names always describe a valid range and re-encode to a parseable name
        if let Some((start, end)) = decode_file_name(s) {
            assert!(start <= end);
            assert!(end <= UNKNOWN_SEQUENCE_NUMBER);
            assert_eq!(decode_file_name(&encode_file_name(start, end)), Some((start, end)));
        }
    }
});
