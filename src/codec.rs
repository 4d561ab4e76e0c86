// MIT License - Copyright (c) 2026 Peter Wright
// Frame codec: byte stream <-> CR LF terminated, checksummed records

//! Wire format: `<3-char code><data><2 hex checksum><CR><LF>`.
//!
//! The checksum is the sum of the code and data bytes modulo 256, written
//! as two uppercase hex digits. There is no start delimiter; a frame is
//! everything since the previous terminator.

use std::fmt;

use crate::constants::{CHECKSUM_LEN, CODE_LEN, CR, LF, MAX_FRAME_LEN};

/// A frame whose checksum verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub code: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Shorter than a code plus a checksum.
    TooShort,
    /// Contains bytes outside 7-bit ASCII.
    NonAscii,
    ChecksumMismatch { expected: String, received: String },
    /// No terminator within [`MAX_FRAME_LEN`] bytes; the rest of the line is skipped.
    Overflow,
}

/// A candidate frame that failed validation. Never reaches the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    /// Candidate bytes, without the terminator.
    pub raw: Vec<u8>,
    pub reason: MalformedReason,
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = String::from_utf8_lossy(&self.raw);
        match &self.reason {
            MalformedReason::TooShort => write!(f, "frame too short: {:?}", raw),
            MalformedReason::NonAscii => write!(f, "non-ASCII frame: {:?}", raw),
            MalformedReason::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch in {:?} (expected {}, got {})",
                raw, expected, received
            ),
            MalformedReason::Overflow => {
                write!(f, "no terminator within {} bytes", MAX_FRAME_LEN)
            }
        }
    }
}

/// One decoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Frame(RawFrame),
    Malformed(MalformedFrame),
}

/// Compute the two-digit checksum of `code + data` bytes.
pub fn checksum(bytes: &[u8]) -> String {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    format!("{:02X}", sum)
}

/// Build a complete wire frame, terminator included.
pub fn encode(code: &str, data: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(code.len() + data.len() + CHECKSUM_LEN + 2);
    frame.extend_from_slice(code.as_bytes());
    frame.extend_from_slice(data.as_bytes());
    let sum = checksum(&frame);
    frame.extend_from_slice(sum.as_bytes());
    frame.push(CR);
    frame.push(LF);
    frame
}

/// Incremental frame decoder.
///
/// Bytes are consumed one at a time against the retained buffer, so the
/// frame boundaries produced never depend on how the stream was chunked.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Set after an overflow until the next terminator.
    discarding: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every frame it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Decoded> {
        chunk.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    fn push(&mut self, byte: u8) -> Option<Decoded> {
        self.buffer.push(byte);

        if self.buffer.ends_with(&[CR, LF]) {
            let end = self.buffer.len() - 2;
            let decoded = (!self.discarding).then(|| classify(&self.buffer[..end]));
            self.buffer.clear();
            self.discarding = false;
            return decoded;
        }

        if self.discarding {
            // Only a trailing CR can matter while skipping.
            self.buffer.clear();
            if byte == CR {
                self.buffer.push(CR);
            }
            return None;
        }

        // A trailing CR may still be the first half of the terminator.
        let candidate_len = self.buffer.len() - usize::from(byte == CR);
        if candidate_len > MAX_FRAME_LEN {
            let raw = std::mem::take(&mut self.buffer);
            if byte == CR {
                self.buffer.push(CR);
            }
            self.discarding = true;
            return Some(Decoded::Malformed(MalformedFrame {
                raw,
                reason: MalformedReason::Overflow,
            }));
        }

        None
    }
}

fn classify(candidate: &[u8]) -> Decoded {
    let malformed = |reason| {
        Decoded::Malformed(MalformedFrame {
            raw: candidate.to_vec(),
            reason,
        })
    };

    if candidate.len() < CODE_LEN + CHECKSUM_LEN {
        return malformed(MalformedReason::TooShort);
    }
    if !candidate.is_ascii() {
        return malformed(MalformedReason::NonAscii);
    }

    let (body, received) = candidate.split_at(candidate.len() - CHECKSUM_LEN);
    let expected = checksum(body);
    if received != expected.as_bytes() {
        return malformed(MalformedReason::ChecksumMismatch {
            expected,
            received: String::from_utf8_lossy(received).into_owned(),
        });
    }

    let (code, data) = body.split_at(CODE_LEN);
    Decoded::Frame(RawFrame {
        code: String::from_utf8_lossy(code).into_owned(),
        data: String::from_utf8_lossy(data).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(code: &str, data: &str) -> Decoded {
        Decoded::Frame(RawFrame {
            code: code.to_string(),
            data: data.to_string(),
        })
    }

    #[test]
    fn test_checksum_known_values() {
        // Poll and "partition 3 in alarm" from the module's protocol examples.
        assert_eq!(checksum(b"000"), "90");
        assert_eq!(checksum(b"6543"), "D2");
        assert_eq!(encode("000", ""), b"00090\r\n");
        assert_eq!(encode("601", "001"), b"60100128\r\n");
    }

    #[test]
    fn test_checksum_wraps_at_256() {
        // 'z' * 3 = 366 -> 0x6E
        assert_eq!(checksum(b"zzz"), "6E");
    }

    #[test]
    fn test_decode_round_trip() {
        let cases = [
            ("000", ""),
            ("601", "1001"),
            ("505", "3"),
            ("550", "1230051524"),
            ("200", "123456"),
            ("999", "free form text"),
        ];
        let mut decoder = FrameDecoder::new();
        for (code, data) in cases {
            let out = decoder.decode(&encode(code, data));
            assert_eq!(out, vec![frame(code, data)], "round trip for {}{}", code, data);
        }
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_zone_alarm_scenario() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(b"60100128\r\n"), vec![frame("601", "001")]);

        let out = decoder.decode(b"60100129\r\n");
        assert_eq!(
            out,
            vec![Decoded::Malformed(MalformedFrame {
                raw: b"60100129".to_vec(),
                reason: MalformedReason::ChecksumMismatch {
                    expected: "28".to_string(),
                    received: "29".to_string(),
                },
            })]
        );
    }

    #[test]
    fn test_any_checksum_byte_flip_is_malformed() {
        let good = encode("601", "001");
        let checksum_positions = [good.len() - 4, good.len() - 3];
        for pos in checksum_positions {
            for replacement in 0..=u8::MAX {
                if replacement == good[pos] {
                    continue;
                }
                let mut bad = good.clone();
                bad[pos] = replacement;
                let out = FrameDecoder::new().decode(&bad);
                assert!(!out.is_empty(), "flip at {} to {:#04x} produced nothing", pos, replacement);
                assert!(
                    out.iter().all(|d| matches!(d, Decoded::Malformed(_))),
                    "flip at {} to {:#04x} produced {:?}",
                    pos,
                    replacement,
                    out
                );
            }
        }
    }

    #[test]
    fn test_partial_bytes_retained() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode(b"6010").is_empty());
        assert_eq!(decoder.pending(), b"6010");
        assert!(decoder.decode(b"0128\r").is_empty());
        assert_eq!(decoder.decode(b"\n"), vec![frame("601", "001")]);
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_chunk_boundary_independence() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&encode("609", "012"));
        stream.extend_from_slice(b"garbage\r\n");
        stream.extend_from_slice(b"\r\n");
        stream.extend_from_slice(&encode("505", "3"));
        stream.extend_from_slice(&[b'X'; MAX_FRAME_LEN + 10]);
        stream.extend_from_slice(b"\r\n");
        stream.extend_from_slice(&encode("650", "1"));
        stream.extend_from_slice(b"6501C");

        let whole = FrameDecoder::new().decode(&stream);

        let mut decoder = FrameDecoder::new();
        let bytewise: Vec<Decoded> = stream.iter().flat_map(|b| decoder.decode(&[*b])).collect();
        assert_eq!(whole, bytewise);

        for chunk_size in [2, 3, 7, 64] {
            let mut decoder = FrameDecoder::new();
            let chunked: Vec<Decoded> = stream
                .chunks(chunk_size)
                .flat_map(|c| decoder.decode(c))
                .collect();
            assert_eq!(whole, chunked, "chunk size {}", chunk_size);
        }

        assert_eq!(whole.len(), 6);
        assert_eq!(whole[0], frame("609", "012"));
        assert!(matches!(whole[1], Decoded::Malformed(_)));
        assert!(matches!(
            &whole[2],
            Decoded::Malformed(MalformedFrame { reason: MalformedReason::TooShort, .. })
        ));
        assert_eq!(whole[3], frame("505", "3"));
        assert!(matches!(
            &whole[4],
            Decoded::Malformed(MalformedFrame { reason: MalformedReason::Overflow, .. })
        ));
        assert_eq!(whole[5], frame("650", "1"));
    }

    #[test]
    fn test_resync_after_garbage() {
        let mut decoder = FrameDecoder::new();
        let mut input = b"\x00\xff1234\r\n".to_vec();
        input.extend_from_slice(&encode("610", "003"));
        let out = decoder.decode(&input);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            Decoded::Malformed(MalformedFrame { reason: MalformedReason::NonAscii, .. })
        ));
        assert_eq!(out[1], frame("610", "003"));
    }

    #[test]
    fn test_longest_frame_accepted() {
        let data = "A".repeat(MAX_FRAME_LEN - CODE_LEN - CHECKSUM_LEN);
        let wire = encode("999", &data);
        assert_eq!(wire.len(), MAX_FRAME_LEN + 2);
        assert_eq!(FrameDecoder::new().decode(&wire), vec![frame("999", &data)]);

        let data = "A".repeat(MAX_FRAME_LEN - CODE_LEN - CHECKSUM_LEN + 1);
        let out = FrameDecoder::new().decode(&encode("999", &data));
        assert!(matches!(
            out.as_slice(),
            [Decoded::Malformed(MalformedFrame { reason: MalformedReason::Overflow, .. })]
        ));
    }

    #[test]
    fn test_lowercase_checksum_rejected() {
        let out = FrameDecoder::new().decode(b"6543d2\r\n");
        assert!(matches!(out[0], Decoded::Malformed(_)));
    }

    #[test]
    fn test_reset_drops_partial() {
        let mut decoder = FrameDecoder::new();
        decoder.decode(b"601");
        decoder.reset();
        assert_eq!(decoder.decode(&encode("000", "")), vec![frame("000", "")]);
    }
}
