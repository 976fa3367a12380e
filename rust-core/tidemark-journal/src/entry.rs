// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tidemark Journal - Entry framing
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Defines the journal entry and its binary framing with CRC32 integrity
// checking. The payload is opaque to the journal; only the sequence number is
// interpreted.
//
// Segment binary format (all integers little-endian), repeated per entry:
//   [4 bytes: frame_length (u32)]  -- length of everything after this field
//   [4 bytes: crc32 checksum]      -- CRC32 of all bytes after this field
//   [8 bytes: sequence (u64)]
//   [N bytes: payload]

use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};

/// Maximum allowed frame size: 64 MiB. Any frame declaring a larger size is
/// treated as corrupted.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Size of the fixed-length frame prefix (frame_length + crc32).
pub const HEADER_PREFIX_SIZE: usize = 4 + 4;

/// Size of the sequence number field.
pub const SEQUENCE_SIZE: usize = 8;

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Sequence number assigned by the log writer. Any value supplied by
    /// the caller is overwritten when the entry is written.
    pub sequence_number: u64,

    /// Opaque payload bytes (a serialized state change).
    pub payload: Vec<u8>,
}

impl JournalEntry {
    /// An entry carrying `payload`, not yet stamped.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence_number: 0,
            payload: payload.into(),
        }
    }

    /// The same entry stamped with `sequence_number`.
    pub fn with_sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Number of bytes this entry occupies on the medium.
    pub fn encoded_len(&self) -> usize {
        HEADER_PREFIX_SIZE + SEQUENCE_SIZE + self.payload.len()
    }

    /// Serialize this entry to its framed binary form.
    pub fn encode(&self) -> Vec<u8> {
        let mut inner = Vec::with_capacity(SEQUENCE_SIZE + self.payload.len());
        inner.extend_from_slice(&self.sequence_number.to_le_bytes());
        inner.extend_from_slice(&self.payload);

        let crc = compute_crc32(&inner);

        // crc32 field + inner content
        let frame_length = (4 + inner.len()) as u32;
        let mut buffer = Vec::with_capacity(4 + frame_length as usize);
        buffer.extend_from_slice(&frame_length.to_le_bytes());
        buffer.extend_from_slice(&crc.to_le_bytes());
        buffer.extend_from_slice(&inner);
        buffer
    }
}

/// Why a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The data ends before the declared frame does.
    Truncated {
        /// Bytes the frame needs, including the length prefix.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// The declared frame length is too small or exceeds [`MAX_FRAME_SIZE`].
    BadLength(u32),
    /// The stored checksum does not match the frame contents.
    CrcMismatch {
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the frame contents.
        actual: u32,
    },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Truncated { needed, available } => {
                write!(f, "truncated frame: need {needed} bytes, have {available}")
            }
            FrameError::BadLength(length) => write!(f, "invalid frame length {length}"),
            FrameError::CrcMismatch { expected, actual } => write!(
                f,
                "crc mismatch: stored {expected:#010x}, computed {actual:#010x}"
            ),
        }
    }
}

/// Decode the frame at the start of `data`.
///
/// Returns the entry and the number of bytes it occupied, so the caller can
/// advance to the next frame.
pub fn decode_frame(data: &[u8]) -> Result<(JournalEntry, usize), FrameError> {
    if data.len() < 4 {
        return Err(FrameError::Truncated {
            needed: 4,
            available: data.len(),
        });
    }
    let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if (frame_length as usize) < 4 + SEQUENCE_SIZE || frame_length > MAX_FRAME_SIZE {
        return Err(FrameError::BadLength(frame_length));
    }

    let total = 4 + frame_length as usize;
    if data.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: data.len(),
        });
    }

    let stored_crc = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let inner = &data[HEADER_PREFIX_SIZE..total];
    let computed_crc = compute_crc32(inner);
    if stored_crc != computed_crc {
        return Err(FrameError::CrcMismatch {
            expected: stored_crc,
            actual: computed_crc,
        });
    }

    let mut sequence = [0u8; SEQUENCE_SIZE];
    sequence.copy_from_slice(&inner[..SEQUENCE_SIZE]);
    let entry = JournalEntry {
        sequence_number: u64::from_le_bytes(sequence),
        payload: inner[SEQUENCE_SIZE..].to_vec(),
    };
    Ok((entry, total))
}

/// Compute a CRC32 checksum over the given byte slice using the IEEE
/// polynomial (same as zlib/gzip).
pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(seq: u64) -> JournalEntry {
        JournalEntry::new(
            serde_json::to_vec(&serde_json::json!({"op": "mkdir", "inode": seq})).unwrap(),
        )
        .with_sequence_number(seq)
    }

    #[test]
    fn test_encode_layout() {
        let entry = sample_entry(9);
        let bytes = entry.encode();
        assert_eq!(bytes.len(), entry.encoded_len());

        let frame_length = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(frame_length as usize, bytes.len() - 4);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 9);
        assert_eq!(&bytes[16..], entry.payload.as_slice());
    }

    #[test]
    fn test_decode_consecutive_frames() {
        let mut data = sample_entry(1).encode();
        data.extend_from_slice(&sample_entry(2).encode());

        let (first, used) = decode_frame(&data).unwrap();
        assert_eq!(first, sample_entry(1));
        let (second, rest) = decode_frame(&data[used..]).unwrap();
        assert_eq!(second, sample_entry(2));
        assert_eq!(used + rest, data.len());
    }

    #[test]
    fn test_empty_payload() {
        let entry = JournalEntry::new(Vec::new()).with_sequence_number(u64::MAX);
        let (decoded, used) = decode_frame(&entry.encode()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(used, HEADER_PREFIX_SIZE + SEQUENCE_SIZE);
    }

    #[test]
    fn test_crc_mismatch_detection() {
        let mut bytes = sample_entry(42).encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        match decode_frame(&bytes) {
            Err(FrameError::CrcMismatch { expected, actual }) => assert_ne!(expected, actual),
            other => panic!("Expected CrcMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_frame() {
        let bytes = sample_entry(3).encode();
        for cut in [0, 2, 4, 10, bytes.len() - 1] {
            assert!(
                matches!(decode_frame(&bytes[..cut]), Err(FrameError::Truncated { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_bad_lengths() {
        let mut zero = vec![0u8; 16];
        zero[0..4].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode_frame(&zero), Err(FrameError::BadLength(0)));

        let mut huge = vec![0u8; 16];
        huge[0..4].copy_from_slice(&(MAX_FRAME_SIZE + 1).to_le_bytes());
        assert_eq!(
            decode_frame(&huge),
            Err(FrameError::BadLength(MAX_FRAME_SIZE + 1))
        );
    }

    #[test]
    fn test_crc32_deterministic() {
        let data = b"tidemark journal";
        assert_eq!(compute_crc32(data), compute_crc32(data));
        assert_ne!(compute_crc32(data), compute_crc32(b"tidemark journaL"));
    }
}
