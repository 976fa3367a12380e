// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for journal entry frame decoding

#![no_main]

use libfuzzer_sys::fuzz_target;
use tidemark_journal::decode_frame;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or fail cleanly, never panic
    if let Ok((entry, consumed)) = decode_frame(data) {
        assert!(consumed <= data.len());
        assert_eq!(entry.encode(), &data[..consumed]);
    }
});
